use crate::trader::types::SellFill;

/// Outcome of an outstanding decision, applied to a position by `apply_transition`
///
/// These are the only events that change `remaining_fraction`, the rungs hit,
/// or the phase. Tick evaluation only records the pending decision.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionTransition {
    /// Executor confirmed a sell; may be partial or (erroneously) over-filled
    SellFilled { fill: SellFill },
    /// Executor refused the order (e.g. insufficient liquidity)
    SellRejected { reason: String },
    /// No fill report arrived within the fill timeout
    DecisionExpired,
}

impl PositionTransition {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SellFilled { .. } => "sell_filled",
            Self::SellRejected { .. } => "sell_rejected",
            Self::DecisionExpired => "decision_expired",
        }
    }

    /// Transitions that leave the position exactly as it was before the decision
    pub fn restores_pre_decision_state(&self) -> bool {
        !matches!(self, Self::SellFilled { .. })
    }
}
