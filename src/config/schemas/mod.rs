// Config schema submodule - one file per section

use crate::config_struct;

mod monitor;
mod trader;

pub use monitor::*;
pub use trader::*;

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        /// Exit policy and re-entry configuration
        trader: TraderConfig = TraderConfig::default(),

        /// Price polling and fill timing
        monitor: MonitorConfig = MonitorConfig::default(),
    }
}
