use super::transitions::PositionTransition;
use super::types::{Position, PositionPhase, RealizedExit};
use crate::errors::PositionError;
use crate::logger::{self, LogTag};
use crate::trader::config::RiskSettings;
use crate::trader::constants::DUST_FRACTION;
use crate::trader::types::ExitReason;

/// What applying a transition changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyEffects {
    /// Fraction of the original size removed from the position
    pub applied_fraction: f64,
    /// Executor reported more than was held; this excess was ignored
    pub overfill: Option<f64>,
    /// Executor filled less than requested by this much
    pub shortfall: Option<f64>,
    pub position_closed: bool,
    /// Set when the position closed with a reason that may re-enter
    pub reentry_eligible: bool,
    pub exit_reason: Option<ExitReason>,
}

/// Apply the outcome of the outstanding decision to a position
///
/// Only fills change `remaining_fraction`; rejections and expiries put the
/// position back in its pre-decision state so the next tick re-evaluates.
pub fn apply_transition(
    position: &mut Position,
    transition: PositionTransition,
    settings: &RiskSettings,
) -> Result<ApplyEffects, PositionError> {
    if position.is_closed() {
        return Err(PositionError::Closed(position.id));
    }

    let pending = position
        .pending
        .take()
        .ok_or(PositionError::NoPendingDecision(position.id))?;

    logger::verbose(
        LogTag::Positions,
        &format!(
            "Applying {} to position {} ({}, pending {})",
            transition.kind(),
            position.id,
            position.mint,
            pending.reason
        ),
    );

    let mut effects = ApplyEffects {
        exit_reason: Some(pending.reason),
        ..ApplyEffects::default()
    };

    let fill = match transition {
        PositionTransition::SellFilled { fill } => fill,
        PositionTransition::SellRejected { reason } => {
            logger::warning(
                LogTag::Positions,
                &format!(
                    "Sell rejected for position {} ({}, {}): {}",
                    position.id, position.mint, pending.reason, reason
                ),
            );
            return Ok(effects);
        }
        PositionTransition::DecisionExpired => {
            logger::warning(
                LogTag::Positions,
                &format!(
                    "Decision for position {} ({}, {}) expired without a fill",
                    position.id, position.mint, pending.reason
                ),
            );
            return Ok(effects);
        }
    };

    let reported = fill.fraction_of_original;
    if !reported.is_finite() || reported <= 0.0 {
        logger::warning(
            LogTag::Positions,
            &format!(
                "Empty fill ({}) for position {} ({}), treating as rejected",
                reported, position.id, pending.reason
            ),
        );
        return Ok(effects);
    }

    let remaining = position.remaining_fraction;
    let applied = if reported > remaining + DUST_FRACTION {
        let excess = reported - remaining;
        effects.overfill = Some(excess);
        logger::warning(
            LogTag::Positions,
            &format!(
                "Executor over-filled position {} ({}): reported {:.4} of original but only {:.4} held, clamped",
                position.id, position.mint, reported, remaining
            ),
        );
        remaining
    } else {
        reported.min(remaining)
    };

    if applied + DUST_FRACTION < pending.requested_fraction.min(remaining) {
        let missing = pending.requested_fraction.min(remaining) - applied;
        effects.shortfall = Some(missing);
        logger::warning(
            LogTag::Positions,
            &format!(
                "Partial fill for position {} ({}): requested {:.4}, filled {:.4} of original",
                position.id, pending.reason, pending.requested_fraction, applied
            ),
        );
    }

    position.remaining_fraction = (remaining - applied).max(0.0);
    effects.applied_fraction = applied;
    position.realized_exits.push(RealizedExit {
        reason: pending.reason,
        fraction_of_original: applied,
        fill_price: fill.fill_price,
        filled_at: fill.filled_at,
    });

    if let ExitReason::TakeProfit { rung, .. } = pending.reason {
        position.ladder_rungs_hit.insert(rung);
    }

    if position.remaining_fraction <= DUST_FRACTION {
        position.remaining_fraction = 0.0;
        position.fully_exited = true;
        position.last_exit_price = Some(fill.fill_price);
        position.exit_time = Some(fill.filled_at);
        position.exit_reason = Some(pending.reason);
        position.phase = if pending.reason == ExitReason::StopLoss {
            position.stop_loss_triggered = true;
            PositionPhase::StoppedOut
        } else {
            PositionPhase::Exited
        };

        effects.position_closed = true;
        effects.reentry_eligible = pending.reason.allows_reentry();

        logger::info(
            LogTag::Positions,
            &format!(
                "Position {} ({}) fully exited via {} at {:.10}, realized pnl {:.6}",
                position.id,
                position.mint,
                pending.reason,
                fill.fill_price,
                position.realized_pnl()
            ),
        );
        return Ok(effects);
    }

    if settings.ladder.is_exhausted(&position.ladder_rungs_hit) {
        position.trailing.activate();
        position.phase = PositionPhase::TrailingOnly;
    } else if !position.ladder_rungs_hit.is_empty() {
        position.phase = PositionPhase::PartiallyExited;
    }

    logger::info(
        LogTag::Positions,
        &format!(
            "Position {} ({}) sold {:.1}% of original via {} at {:.10}, remaining {:.1}%",
            position.id,
            position.mint,
            applied * 100.0,
            pending.reason,
            fill.fill_price,
            position.remaining_fraction * 100.0
        ),
    );

    Ok(effects)
}
