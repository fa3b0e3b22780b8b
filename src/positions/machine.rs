//! Per-tick evaluation of one position
//!
//! Order of evaluation for a tick at price `p`:
//! 1. multiple `m = p / entry_price`
//! 2. peak update (before any trigger)
//! 3. stop loss, unless an active trailing stop already locks in a gain
//! 4. lowest pending ladder rung
//! 5. trailing stop, once the ladder is exhausted
//! 6. hold
//!
//! A fired rule records the decision as pending; the position itself only
//! changes when the outcome is applied (see `apply`).

use super::apply::apply_transition;
use super::transitions::PositionTransition;
use super::types::{PendingDecision, Position};
use crate::arguments::is_debug_positions_enabled;
use crate::errors::TickError;
use crate::logger::{self, LogTag};
use crate::trader::config::RiskSettings;
use crate::trader::exit::{is_stop_loss_triggered, LadderPolicy};
use crate::trader::types::{Decision, ExitReason};
use chrono::{DateTime, Utc};

/// Evaluate one price tick for a position
///
/// Errors mean the tick was discarded and the position is unchanged
/// (apart from an expired pending decision being cleared).
pub fn evaluate_tick(
    position: &mut Position,
    price: f64,
    observed_at: DateTime<Utc>,
    now: DateTime<Utc>,
    settings: &RiskSettings,
) -> Result<Decision, TickError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(TickError::InvalidPrice {
            mint: position.mint.clone(),
            price,
        });
    }

    let age = now - observed_at;
    if age > settings.price_max_age {
        return Err(TickError::StalePrice {
            mint: position.mint.clone(),
            age_ms: age.num_milliseconds(),
        });
    }

    if position.is_closed() {
        return Err(TickError::PositionClosed {
            position_id: position.id,
        });
    }

    if let Some(pending) = &position.pending {
        if now - pending.issued_at < settings.fill_timeout {
            return Err(TickError::DecisionPending {
                position_id: position.id,
            });
        }
        // Timed out: fail it and evaluate this tick fresh
        if let Err(e) = apply_transition(position, PositionTransition::DecisionExpired, settings) {
            logger::warning(
                LogTag::Positions,
                &format!("Could not expire decision on position {}: {}", position.id, e),
            );
        }
    }

    let multiple = position.multiple_at(price);
    position.trailing.observe(multiple);
    position.last_price = Some(price);

    if is_debug_positions_enabled() {
        logger::debug(
            LogTag::Positions,
            &format!(
                "Tick {} ({}): price={:.10} m={:.4} peak={:.4} remaining={:.3}",
                position.id,
                position.mint,
                price,
                multiple,
                position.peak_multiple(),
                position.remaining_fraction
            ),
        );
    }

    if !position.trailing.protects_entry()
        && is_stop_loss_triggered(multiple, settings.stop_loss_pct)
    {
        logger::info(
            LogTag::Trader,
            &format!(
                "Stop loss {}% hit for {} (position {}): m={:.4}, exit {:.1}% remaining",
                settings.stop_loss_pct,
                position.mint,
                position.id,
                multiple,
                position.remaining_fraction * 100.0
            ),
        );
        return Ok(issue_sell_all(position, ExitReason::StopLoss, price, now));
    }

    if let Some((index, rung)) = settings.ladder.next_rung(multiple, &position.ladder_rungs_hit) {
        let fraction_of_remaining =
            LadderPolicy::sell_fraction_of_remaining(&rung, position.remaining_fraction);
        let requested_fraction = rung.fraction.min(position.remaining_fraction);
        let reason = ExitReason::TakeProfit {
            rung: index,
            multiple: rung.multiple,
        };
        let decision = Decision::Sell {
            fraction_of_remaining,
            reason,
        };

        logger::info(
            LogTag::Trader,
            &format!(
                "{}x rung hit for {} (position {}): m={:.4}, selling {:.1}% of original ({:.2}% of holdings)",
                rung.multiple,
                position.mint,
                position.id,
                multiple,
                rung.fraction * 100.0,
                fraction_of_remaining * 100.0
            ),
        );

        position.pending = Some(PendingDecision {
            decision: decision.clone(),
            reason,
            requested_fraction,
            fraction_of_remaining,
            reference_price: price,
            issued_at: now,
        });
        return Ok(decision);
    }

    if settings.ladder.is_exhausted(&position.ladder_rungs_hit)
        && position.trailing.is_triggered(multiple)
    {
        logger::info(
            LogTag::Trader,
            &format!(
                "Trailing stop {}% hit for {} (position {}): m={:.4}, peak={:.4}, floor={:.4}",
                position.trailing.trail_pct(),
                position.mint,
                position.id,
                multiple,
                position.peak_multiple(),
                position.trailing.floor_multiple()
            ),
        );
        return Ok(issue_sell_all(position, ExitReason::TrailingStop, price, now));
    }

    Ok(Decision::Hold)
}

/// Record a full exit as the pending decision
pub fn issue_sell_all(
    position: &mut Position,
    reason: ExitReason,
    price: f64,
    now: DateTime<Utc>,
) -> Decision {
    let decision = Decision::SellAll { reason };
    position.pending = Some(PendingDecision {
        decision: decision.clone(),
        reason,
        requested_fraction: position.remaining_fraction,
        fraction_of_remaining: 1.0,
        reference_price: price,
        issued_at: now,
    });
    decision
}
