//! Trailing stop tracker
//!
//! Keeps the running peak multiple of a position and tells whether the
//! current multiple has retraced `trail_pct` percent from it. The tracker is
//! armed only once the ladder is exhausted (or from the start for an empty
//! ladder); before that, scheduled profit-taking has priority.

use crate::trader::constants::MULTIPLE_EPSILON;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopTracker {
    trail_pct: f64,
    peak_multiple: f64,
    active: bool,
    require_profit: bool,
}

impl TrailingStopTracker {
    /// New tracker at entry (peak 1.0)
    pub fn new(trail_pct: f64, active: bool, require_profit: bool) -> Self {
        Self {
            trail_pct,
            peak_multiple: 1.0,
            active,
            require_profit,
        }
    }

    /// Record a tick; the peak never decreases
    pub fn observe(&mut self, multiple: f64) {
        if multiple > self.peak_multiple {
            self.peak_multiple = multiple;
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn peak_multiple(&self) -> f64 {
        self.peak_multiple
    }

    pub fn trail_pct(&self) -> f64 {
        self.trail_pct
    }

    /// Exit floor: `peak * (1 - trail/100)`
    pub fn floor_multiple(&self) -> f64 {
        self.peak_multiple * (1.0 - self.trail_pct / 100.0)
    }

    /// Active and the floor sits above entry, i.e. a gain is locked in
    pub fn protects_entry(&self) -> bool {
        self.active && self.floor_multiple() > 1.0 + MULTIPLE_EPSILON
    }

    /// Whether `multiple` has fallen to or below the floor
    ///
    /// Always false while inactive. With `require_profit`, also false until
    /// the peak has been above entry.
    pub fn is_triggered(&self, multiple: f64) -> bool {
        if !self.active {
            return false;
        }
        if self.require_profit && self.peak_multiple <= 1.0 + MULTIPLE_EPSILON {
            return false;
        }
        multiple <= self.floor_multiple() + MULTIPLE_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_and_trigger() {
        let mut tracker = TrailingStopTracker::new(15.0, true, false);
        tracker.observe(20.0);

        assert!((tracker.floor_multiple() - 17.0).abs() < 1e-9);
        assert!(!tracker.is_triggered(17.5));
        assert!(tracker.is_triggered(17.0));
        assert!(tracker.is_triggered(3.0));
    }

    #[test]
    fn test_peak_is_monotonic() {
        let mut tracker = TrailingStopTracker::new(15.0, false, false);
        tracker.observe(6.0);
        tracker.observe(5.1);
        tracker.observe(0.5);
        assert_eq!(tracker.peak_multiple(), 6.0);
    }

    #[test]
    fn test_inactive_never_triggers() {
        let mut tracker = TrailingStopTracker::new(15.0, false, false);
        tracker.observe(6.0);
        assert!(!tracker.is_triggered(5.1));

        tracker.activate();
        assert!(tracker.is_triggered(5.1));
    }

    #[test]
    fn test_protects_entry() {
        let mut tracker = TrailingStopTracker::new(15.0, true, false);
        tracker.observe(1.1);
        // 1.1 * 0.85 = 0.935, still below entry
        assert!(!tracker.protects_entry());
        tracker.observe(2.0);
        assert!(tracker.protects_entry());
    }

    #[test]
    fn test_require_profit() {
        let tracker = TrailingStopTracker::new(15.0, true, true);
        // Peak still at entry: the 0.85 floor does not fire
        assert!(!tracker.is_triggered(0.8));

        let loose = TrailingStopTracker::new(15.0, true, false);
        assert!(loose.is_triggered(0.8));
    }
}
