//! Fixed stop loss measured from entry
//!
//! `stop_loss_pct` is negative: -30 means exit once the multiple is at or
//! below 0.70.

use crate::trader::constants::MULTIPLE_EPSILON;

/// Multiple at which the stop fires
pub fn stop_loss_floor(stop_loss_pct: f64) -> f64 {
    1.0 + stop_loss_pct / 100.0
}

pub fn is_stop_loss_triggered(multiple: f64, stop_loss_pct: f64) -> bool {
    multiple <= stop_loss_floor(stop_loss_pct) + MULTIPLE_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_loss_boundaries() {
        assert!((stop_loss_floor(-30.0) - 0.7).abs() < 1e-12);
        assert!(!is_stop_loss_triggered(0.75, -30.0));
        assert!(is_stop_loss_triggered(0.70, -30.0));
        assert!(is_stop_loss_triggered(0.65, -30.0));
    }
}
