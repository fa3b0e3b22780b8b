//! File persistence for log lines
//!
//! Nothing is written until `init_file_logging` has opened the daily file.

use super::config::get_logger_config;
use chrono::Local;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

static LOG_FILE: OnceCell<Mutex<BufWriter<File>>> = OnceCell::new();

pub fn init_file_logging() {
    let log_dir = get_logger_config().log_dir;
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory '{}': {}", log_dir, e);
        return;
    }

    let file_name = format!("launchsniper_{}.log", Local::now().format("%Y-%m-%d"));
    let path = Path::new(&log_dir).join(file_name);
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let _ = LOG_FILE.set(Mutex::new(BufWriter::new(file)));
        }
        Err(e) => eprintln!("Failed to open log file '{}': {}", path.display(), e),
    }
}

pub fn write_to_file(line: &str) {
    if let Some(writer) = LOG_FILE.get() {
        let mut writer = writer.lock();
        let _ = writeln!(writer, "{}", line);
    }
}

pub fn flush_file_logging() {
    if let Some(writer) = LOG_FILE.get() {
        let _ = writer.lock().flush();
    }
}
