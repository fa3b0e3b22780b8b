//! Exit policy and re-entry configuration

use crate::config_struct;

config_struct! {
    /// Trading configuration consumed by the risk engine
    pub struct TraderConfig {
        /// Trader control
        enabled: bool = true,
        /// Simulate fills instead of sending swaps
        dry_run: bool = true,
        /// Quote amount spent per entry (token units = trade_size / price)
        trade_size: f64 = 10.0,

        // ==================== STOP LOSS ====================
        /// Hard stop from entry, negative percent (-30 = exit at 0.70x)
        stop_loss_pct: f64 = -30.0,

        // ==================== TRAILING STOP ====================
        /// Retracement from peak that exits the remainder (overridden by `rest:trailN`)
        trailing_stop_pct: f64 = 15.0,
        /// Only let the trailing stop fire once the peak has been above entry
        trailing_require_profit: bool = false,

        // ==================== TAKE PROFIT LADDER ====================
        /// Rungs as `<multiple>x:<percent of original>`, comma separated
        tp_ladder: String = "2x:25,4x:25,10x:30,rest:trail15".to_string(),

        // ==================== RE-ENTRY ====================
        reentry_enabled: bool = true,
        /// Bounce above the exit price required before buying back
        reentry_confirm_pct: f64 = 7.0,
        max_reentries_per_token: u32 = 1,
        /// How long a token is watched for a bounce after the exit
        reentry_window_secs: u64 = 600,
    }
}
