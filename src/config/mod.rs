//! Configuration system
//!
//! TOML schemas with embedded defaults (`config_struct!`), a process-wide
//! instance for binaries, and hot reload. The risk engine never reads the
//! global directly: it is handed a validated `RiskSettings`.

mod macros;
mod schemas;
mod utils;

pub use schemas::{Config, MonitorConfig, TraderConfig};
pub use utils::{
    get_config_clone, load_config, load_config_from_path, parse_config, reload_config_from_path,
    with_config, CONFIG_FILE_PATH,
};
