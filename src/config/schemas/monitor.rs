//! Price monitoring and execution timing configuration

use crate::config_struct;

config_struct! {
    pub struct MonitorConfig {
        /// Delay between price polls for one position
        price_poll_interval_ms: u64 = 500,
        /// Quotes older than this are discarded
        price_max_age_secs: u64 = 10,
        /// A sell or buy without a fill report after this long is failed
        fill_timeout_secs: u64 = 30,
    }
}
