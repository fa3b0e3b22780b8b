use crate::positions::PositionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an exit was requested
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Ladder rung `rung` (index into the ladder) at `multiple`
    TakeProfit { rung: usize, multiple: f64 },
    StopLoss,
    TrailingStop,
    Manual,
}

impl ExitReason {
    /// Full exits with these reasons may arm a re-entry watch
    pub fn allows_reentry(&self) -> bool {
        matches!(self, ExitReason::TakeProfit { .. } | ExitReason::TrailingStop)
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::TakeProfit { multiple, .. } => write!(f, "take profit {}x", multiple),
            ExitReason::StopLoss => write!(f, "stop loss"),
            ExitReason::TrailingStop => write!(f, "trailing stop"),
            ExitReason::Manual => write!(f, "manual"),
        }
    }
}

/// Output of one tick evaluation. Never mutates state by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decision {
    /// Sell this fraction of the CURRENT holdings
    Sell {
        fraction_of_remaining: f64,
        reason: ExitReason,
    },
    SellAll {
        reason: ExitReason,
    },
    /// Buy back `size` token units
    Reenter {
        size: f64,
    },
    Hold,
}

impl Decision {
    pub fn is_hold(&self) -> bool {
        matches!(self, Decision::Hold)
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, Decision::Sell { .. } | Decision::SellAll { .. })
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        match self {
            Decision::Sell { reason, .. } | Decision::SellAll { reason } => Some(*reason),
            _ => None,
        }
    }
}

/// Sell instruction handed to an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellOrder {
    pub position_id: PositionId,
    pub mint: String,
    /// Fraction of current holdings to sell (1.0 for SellAll)
    pub fraction_of_remaining: f64,
    /// Remaining fraction of the original size when the order was issued
    pub remaining_fraction: f64,
    pub initial_size: f64,
    pub reason: ExitReason,
    /// Price of the tick that produced the decision
    pub reference_price: f64,
}

impl SellOrder {
    /// Token units this order asks to sell
    pub fn token_amount(&self) -> f64 {
        self.initial_size * self.remaining_fraction * self.fraction_of_remaining
    }
}

/// Buy instruction for a re-entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub mint: String,
    pub size: f64,
    pub reference_price: f64,
}

/// Executor report of a completed sell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SellFill {
    /// Filled amount as a fraction of the ORIGINAL position size
    pub fraction_of_original: f64,
    pub fill_price: f64,
    pub filled_at: DateTime<Utc>,
}

impl SellFill {
    /// Build a fill from a token amount sold out of a position of `initial_size`
    pub fn from_tokens(tokens_sold: f64, initial_size: f64, fill_price: f64) -> Self {
        let fraction_of_original = if initial_size > 0.0 {
            tokens_sold / initial_size
        } else {
            0.0
        };
        Self {
            fraction_of_original,
            fill_price,
            filled_at: Utc::now(),
        }
    }
}

/// Executor report of a completed buy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuyFill {
    pub size: f64,
    pub fill_price: f64,
    pub filled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sell_order_token_amount() {
        let order = SellOrder {
            position_id: 1,
            mint: "MINT".to_string(),
            fraction_of_remaining: 0.5,
            remaining_fraction: 0.7,
            initial_size: 100.0,
            reason: ExitReason::TakeProfit { rung: 1, multiple: 5.0 },
            reference_price: 5.0,
        };
        assert!((order.token_amount() - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_fill_from_tokens() {
        let fill = SellFill::from_tokens(30.0, 100.0, 2.1);
        assert!((fill.fraction_of_original - 0.3).abs() < 1e-12);
        assert_eq!(SellFill::from_tokens(1.0, 0.0, 1.0).fraction_of_original, 0.0);
    }

    #[test]
    fn test_reentry_eligibility() {
        assert!(ExitReason::TrailingStop.allows_reentry());
        assert!(ExitReason::TakeProfit { rung: 0, multiple: 2.0 }.allows_reentry());
        assert!(!ExitReason::StopLoss.allows_reentry());
        assert!(!ExitReason::Manual.allows_reentry());
    }
}
