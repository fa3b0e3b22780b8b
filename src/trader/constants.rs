//! Trader constants

/// Absolute tolerance for multiple comparisons (rung thresholds, stop floors)
pub const MULTIPLE_EPSILON: f64 = 1e-9;

/// Remaining fraction at or below this is treated as fully exited
pub const DUST_FRACTION: f64 = 1e-9;

/// Poll interval used when the monitor has nothing to evaluate yet
pub const IDLE_POLL_INTERVAL_MS: u64 = 1_000;
