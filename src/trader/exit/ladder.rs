//! Take-profit ladder
//!
//! A ladder is an ordered list of rungs `(multiple_threshold, sell_fraction)`
//! where the fraction is of the ORIGINAL position size. Thresholds are
//! strictly increasing and fractions sum to at most 1; the remainder is held
//! for the trailing stop.

use crate::errors::ConfigError;
use crate::trader::constants::MULTIPLE_EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderRung {
    /// Multiple of entry price that fires the rung
    pub multiple: f64,
    /// Fraction of the original size sold at this rung, in (0, 1]
    pub fraction: f64,
}

/// Validated, immutable take-profit schedule
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LadderPolicy {
    rungs: Vec<LadderRung>,
}

/// Result of parsing ladder text: the rungs plus an optional `rest:trailN`
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLadder {
    pub policy: LadderPolicy,
    pub rest_trail_pct: Option<f64>,
}

impl LadderPolicy {
    /// Build a ladder, rejecting rungs that would make behavior undefined
    pub fn new(rungs: Vec<LadderRung>) -> Result<Self, ConfigError> {
        let mut previous: Option<f64> = None;
        let mut total = 0.0;

        for rung in &rungs {
            if !rung.multiple.is_finite() || rung.multiple <= 1.0 {
                return Err(ConfigError::InvalidLadder(format!(
                    "threshold {}x must be above 1x",
                    rung.multiple
                )));
            }
            if let Some(prev) = previous {
                if rung.multiple <= prev {
                    return Err(ConfigError::InvalidLadder(format!(
                        "thresholds must be strictly increasing ({}x after {}x)",
                        rung.multiple, prev
                    )));
                }
            }
            if !rung.fraction.is_finite() || rung.fraction <= 0.0 || rung.fraction > 1.0 {
                return Err(ConfigError::InvalidLadder(format!(
                    "sell fraction {} at {}x must be in (0, 1]",
                    rung.fraction, rung.multiple
                )));
            }
            total += rung.fraction;
            previous = Some(rung.multiple);
        }

        if total > 1.0 + MULTIPLE_EPSILON {
            return Err(ConfigError::InvalidLadder(format!(
                "sell fractions sum to {:.1}%, more than 100%",
                total * 100.0
            )));
        }

        Ok(Self { rungs })
    }

    /// Parse `"2x:25,4x:25,10x:30,rest:trail15"`
    ///
    /// Percents are of the original size. The `x` suffix and a trailing `%`
    /// are optional; whitespace and case are ignored. An empty string is an
    /// empty ladder.
    pub fn parse(text: &str) -> Result<ParsedLadder, ConfigError> {
        let mut rungs = Vec::new();
        let mut rest_trail_pct = None;

        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let malformed = |reason: &str| ConfigError::MalformedLadder {
                item: item.to_string(),
                reason: reason.to_string(),
            };

            let (key, value) = item
                .split_once(':')
                .ok_or_else(|| malformed("expected '<multiple>x:<percent>'"))?;
            let key = key.trim().to_lowercase();
            let value = value.trim().to_lowercase();

            if key == "rest" {
                if rest_trail_pct.is_some() {
                    return Err(malformed("duplicate 'rest' item"));
                }
                let pct = value
                    .strip_prefix("trail")
                    .ok_or_else(|| malformed("'rest' only supports 'trail<percent>'"))?;
                let pct = parse_number(pct).ok_or_else(|| malformed("invalid trail percent"))?;
                rest_trail_pct = Some(pct);
                continue;
            }

            if rest_trail_pct.is_some() {
                return Err(malformed("'rest' must be the last item"));
            }

            let multiple = parse_number(key.strip_suffix('x').unwrap_or(&key))
                .ok_or_else(|| malformed("invalid multiple"))?;
            let percent = parse_number(value.strip_suffix('%').unwrap_or(&value))
                .ok_or_else(|| malformed("invalid percent"))?;
            if percent <= 0.0 || percent > 100.0 {
                return Err(malformed("percent must be in (0, 100]"));
            }

            rungs.push(LadderRung {
                multiple,
                fraction: percent / 100.0,
            });
        }

        Ok(ParsedLadder {
            policy: Self::new(rungs)?,
            rest_trail_pct,
        })
    }

    pub fn rungs(&self) -> &[LadderRung] {
        &self.rungs
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }

    /// Sum of all rung fractions (share of the original size the ladder sells)
    pub fn total_fraction(&self) -> f64 {
        self.rungs.iter().map(|r| r.fraction).sum()
    }

    /// Highest rung threshold, if any
    pub fn last_multiple(&self) -> Option<f64> {
        self.rungs.last().map(|r| r.multiple)
    }

    /// The single next eligible rung at `multiple`, skipping rungs already hit
    ///
    /// Rungs are checked ascending and the search stops at the first unhit
    /// rung: it fires if its threshold is reached (however far the price
    /// overshot), otherwise nothing does. A jump across several thresholds
    /// therefore only yields the lowest pending rung.
    pub fn next_rung(&self, multiple: f64, hit: &BTreeSet<usize>) -> Option<(usize, LadderRung)> {
        let (index, rung) = self
            .rungs
            .iter()
            .enumerate()
            .find(|(index, _)| !hit.contains(index))?;

        if multiple + MULTIPLE_EPSILON >= rung.multiple {
            Some((index, *rung))
        } else {
            None
        }
    }

    /// True once every rung has been hit (always true for an empty ladder)
    pub fn is_exhausted(&self, hit: &BTreeSet<usize>) -> bool {
        (0..self.rungs.len()).all(|index| hit.contains(&index))
    }

    /// Convert a rung's share of the original size into a share of current holdings
    ///
    /// The executor only knows what is held now, so a 20% rung with 70% left
    /// becomes "sell 28.57% of what you hold". Clamped to 1.
    pub fn sell_fraction_of_remaining(rung: &LadderRung, remaining_fraction: f64) -> f64 {
        if remaining_fraction <= 0.0 {
            return 0.0;
        }
        (rung.fraction / remaining_fraction).min(1.0)
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_ladder() -> LadderPolicy {
        LadderPolicy::parse("2x:30,5x:20,10x:10,15x:15,20x:15")
            .unwrap()
            .policy
    }

    #[test]
    fn test_parse_default_ladder() {
        let parsed = LadderPolicy::parse("2x:25,4x:25,10x:30,rest:trail15").unwrap();
        assert_eq!(parsed.policy.len(), 3);
        assert_eq!(parsed.rest_trail_pct, Some(15.0));
        assert_eq!(parsed.policy.rungs()[1], LadderRung { multiple: 4.0, fraction: 0.25 });
        assert!((parsed.policy.total_fraction() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_parse_is_lenient_on_format() {
        let parsed = LadderPolicy::parse(" 2X : 25% , 3:10 ").unwrap();
        assert_eq!(parsed.policy.len(), 2);
        assert_eq!(parsed.policy.rungs()[1].multiple, 3.0);
        assert_eq!(parsed.rest_trail_pct, None);

        assert!(LadderPolicy::parse("").unwrap().policy.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_items() {
        for text in ["2x", "abc:25", "2x:lots", "rest:hold", "2x:0", "2x:150", "rest:trail10,3x:20"] {
            assert!(LadderPolicy::parse(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn test_rejects_invariant_violations() {
        // Fractions above 100%
        assert!(matches!(
            LadderPolicy::parse("2x:60,4x:50"),
            Err(ConfigError::InvalidLadder(_))
        ));
        // Non-increasing thresholds
        assert!(LadderPolicy::parse("4x:20,2x:20").is_err());
        assert!(LadderPolicy::parse("2x:20,2x:20").is_err());
        // Threshold at or below entry
        assert!(LadderPolicy::parse("1x:20").is_err());
        // Exactly 100% is fine
        assert!(LadderPolicy::parse("2x:50,4x:50").is_ok());
    }

    #[test]
    fn test_next_rung_fires_lowest_pending_only() {
        let ladder = scenario_ladder();
        let mut hit = BTreeSet::new();

        assert_eq!(ladder.next_rung(1.9, &hit), None);
        assert_eq!(ladder.next_rung(2.1, &hit).map(|(i, _)| i), Some(0));

        // A jump straight to 12x still yields only the 2x rung
        assert_eq!(ladder.next_rung(12.0, &hit).map(|(i, _)| i), Some(0));

        hit.insert(0);
        assert_eq!(ladder.next_rung(6.0, &hit).map(|(i, _)| i), Some(1));
        hit.insert(1);
        assert_eq!(ladder.next_rung(6.0, &hit), None);
    }

    #[test]
    fn test_exact_threshold_fires() {
        let ladder = scenario_ladder();
        let hit = BTreeSet::new();
        assert!(ladder.next_rung(2.0, &hit).is_some());
    }

    #[test]
    fn test_exhaustion() {
        let ladder = scenario_ladder();
        let mut hit: BTreeSet<usize> = (0..4).collect();
        assert!(!ladder.is_exhausted(&hit));
        hit.insert(4);
        assert!(ladder.is_exhausted(&hit));
        assert!(LadderPolicy::default().is_exhausted(&BTreeSet::new()));
    }

    #[test]
    fn test_fraction_conversion() {
        let rung = LadderRung { multiple: 5.0, fraction: 0.2 };
        let converted = LadderPolicy::sell_fraction_of_remaining(&rung, 0.7);
        assert!((converted - 0.2 / 0.7).abs() < 1e-12);
        assert_eq!(LadderPolicy::sell_fraction_of_remaining(&rung, 0.1), 1.0);
        assert_eq!(LadderPolicy::sell_fraction_of_remaining(&rung, 0.0), 0.0);
    }
}
