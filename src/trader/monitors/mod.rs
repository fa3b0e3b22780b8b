//! Monitoring loops - orchestration only
//!
//! One task per token polls the price source, feeds the engine and hands
//! resulting decisions to the executor. Decision logic lives in `positions`.

mod position;

pub use position::{
    execute_exit, execute_reentry, monitor_token, spawn_monitors, spawn_token_monitor,
    MonitorOutcome,
};

use crate::config::Config;
use std::time::Duration;

/// Timing for the monitor loops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Upper bound on one executor call
    pub fill_timeout: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.monitor.price_poll_interval_ms),
            fill_timeout: Duration::from_secs(config.monitor.fill_timeout_secs),
        }
    }
}
