//! Configuration utilities - loading, reloading, and access helpers

use super::schemas::Config;
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::path::Path;

/// Global configuration instance, defaults until a file is loaded
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::default()));

/// Path the global configuration was loaded from
static LOADED_PATH: OnceCell<String> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration from the default path
pub fn load_config() -> Result<(), ConfigError> {
    load_config_from_path(CONFIG_FILE_PATH)
}

/// Load configuration from a specific file path into the global instance
///
/// A missing file is not an error: defaults are used and a warning logged.
/// Can only be called once per process; use `reload_config_from_path` after.
pub fn load_config_from_path(path: &str) -> Result<(), ConfigError> {
    let config = if Path::new(path).exists() {
        let contents = read_config_file(path)?;
        parse_config(&contents, path)?
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        Config::default()
    };

    LOADED_PATH
        .set(path.to_string())
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    *CONFIG.write() = config;

    logger::info(LogTag::Config, &format!("Configuration loaded from '{}'", path));
    Ok(())
}

/// Reload configuration from disk, replacing the global instance atomically
pub fn reload_config_from_path(path: &str) -> Result<(), ConfigError> {
    if LOADED_PATH.get().is_none() {
        return Err(ConfigError::NotInitialized);
    }

    let contents = read_config_file(path)?;
    let new_config = parse_config(&contents, path)?;
    *CONFIG.write() = new_config;

    logger::info(LogTag::Config, &format!("Configuration reloaded from '{}'", path));
    Ok(())
}

/// Parse TOML text into a `Config`; `path` is only used for error messages
pub fn parse_config(contents: &str, path: &str) -> Result<Config, ConfigError> {
    toml::from_str::<Config>(contents).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })
}

fn read_config_file(path: &str) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })
}

/// Execute a function with read access to the configuration
///
/// ```
/// use launchsniper::config::with_config;
///
/// let trail = with_config(|cfg| cfg.trader.trailing_stop_pct);
/// assert!(trail > 0.0);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config = CONFIG.read();
    f(&config)
}

/// Get a clone of the entire configuration
pub fn get_config_clone() -> Config {
    CONFIG.read().clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let toml = r#"
            [trader]
            stop_loss_pct = -25.0
            tp_ladder = "3x:50"

            [monitor]
            fill_timeout_secs = 5
        "#;

        let config = parse_config(toml, "inline").unwrap();
        assert_eq!(config.trader.stop_loss_pct, -25.0);
        assert_eq!(config.trader.tp_ladder, "3x:50");
        assert_eq!(config.trader.trailing_stop_pct, 15.0);
        assert_eq!(config.trader.max_reentries_per_token, 1);
        assert_eq!(config.monitor.fill_timeout_secs, 5);
        assert_eq!(config.monitor.price_poll_interval_ms, 500);
    }

    #[test]
    fn test_parse_error_names_path() {
        let err = parse_config("[trader]\nstop_loss_pct = \"a lot\"", "bad.toml").unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, "bad.toml"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[trader]\nreentry_confirm_pct = 12.5").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let contents = read_config_file(&path).unwrap();
        let config = parse_config(&contents, &path).unwrap();
        assert_eq!(config.trader.reentry_confirm_pct, 12.5);
        assert!(config.trader.reentry_enabled);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_config_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
