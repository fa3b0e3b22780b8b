use crate::trader::config::RiskSettings;
use crate::trader::exit::TrailingStopTracker;
use crate::trader::types::{Decision, ExitReason, SellOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type PositionId = u64;

/// Lifecycle phase of a position
///
/// `Open` → `PartiallyExited` (some rungs hit) → `TrailingOnly` (ladder
/// exhausted) → `Exited`. `StoppedOut` is terminal and reached by a stop loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionPhase {
    Open,
    PartiallyExited,
    TrailingOnly,
    Exited,
    StoppedOut,
}

impl PositionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionPhase::Exited | PositionPhase::StoppedOut)
    }
}

/// The single decision a position may have outstanding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingDecision {
    pub decision: Decision,
    pub reason: ExitReason,
    /// Amount requested, as a fraction of the original size
    pub requested_fraction: f64,
    pub fraction_of_remaining: f64,
    pub reference_price: f64,
    pub issued_at: DateTime<Utc>,
}

/// A confirmed sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedExit {
    pub reason: ExitReason,
    pub fraction_of_original: f64,
    pub fill_price: f64,
    pub filled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    /// Token identity, scopes re-entry counting
    pub mint: String,
    pub entry_price: f64,
    /// Token units bought at open
    pub initial_size: f64,
    /// Share of `initial_size` still held, in [0, 1]
    pub remaining_fraction: f64,
    pub ladder_rungs_hit: BTreeSet<usize>,
    pub trailing: TrailingStopTracker,
    pub stop_loss_triggered: bool,
    pub fully_exited: bool,
    pub reentry_count: u32,
    pub phase: PositionPhase,
    pub pending: Option<PendingDecision>,
    pub exit_reason: Option<ExitReason>,
    pub last_price: Option<f64>,
    pub last_exit_price: Option<f64>,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub realized_exits: Vec<RealizedExit>,
}

impl Position {
    /// New position from a confirmed buy fill
    pub fn new(
        id: PositionId,
        mint: &str,
        size: f64,
        entry_price: f64,
        reentry_count: u32,
        settings: &RiskSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let ladder_empty = settings.ladder.is_empty();
        Self {
            id,
            mint: mint.to_string(),
            entry_price,
            initial_size: size,
            remaining_fraction: 1.0,
            ladder_rungs_hit: BTreeSet::new(),
            trailing: TrailingStopTracker::new(
                settings.trailing_stop_pct,
                ladder_empty,
                settings.trailing_require_profit,
            ),
            stop_loss_triggered: false,
            fully_exited: false,
            reentry_count,
            phase: if ladder_empty {
                PositionPhase::TrailingOnly
            } else {
                PositionPhase::Open
            },
            pending: None,
            exit_reason: None,
            last_price: None,
            last_exit_price: None,
            entry_time: now,
            exit_time: None,
            realized_exits: Vec::new(),
        }
    }

    pub fn multiple_at(&self, price: f64) -> f64 {
        price / self.entry_price
    }

    pub fn peak_multiple(&self) -> f64 {
        self.trailing.peak_multiple()
    }

    pub fn trailing_active(&self) -> bool {
        self.trailing.is_active()
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Token units still held
    pub fn remaining_size(&self) -> f64 {
        self.initial_size * self.remaining_fraction
    }

    /// Profit of confirmed sells, in quote units
    pub fn realized_pnl(&self) -> f64 {
        self.realized_exits
            .iter()
            .map(|exit| exit.fraction_of_original * self.initial_size * (exit.fill_price - self.entry_price))
            .sum()
    }

    /// Sell instruction for the outstanding decision, if any
    pub fn sell_order(&self) -> Option<SellOrder> {
        let pending = self.pending.as_ref()?;
        Some(SellOrder {
            position_id: self.id,
            mint: self.mint.clone(),
            fraction_of_remaining: pending.fraction_of_remaining,
            remaining_fraction: self.remaining_fraction,
            initial_size: self.initial_size,
            reason: pending.reason,
            reference_price: pending.reference_price,
        })
    }

    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            id: self.id,
            mint: self.mint.clone(),
            phase: self.phase,
            entry_price: self.entry_price,
            initial_size: self.initial_size,
            remaining_fraction: self.remaining_fraction,
            remaining_size: self.remaining_size(),
            peak_multiple: self.peak_multiple(),
            current_multiple: self.last_price.map(|p| self.multiple_at(p)),
            ladder_rungs_hit: self.ladder_rungs_hit.iter().copied().collect(),
            trailing_active: self.trailing_active(),
            trailing_floor: self.trailing.floor_multiple(),
            reentry_count: self.reentry_count,
            has_pending_decision: self.pending.is_some(),
            exit_reason: self.exit_reason,
            realized_pnl: self.realized_pnl(),
            entry_time: self.entry_time,
            exit_time: self.exit_time,
        }
    }
}

/// Read-only view of a position for status display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub id: PositionId,
    pub mint: String,
    pub phase: PositionPhase,
    pub entry_price: f64,
    pub initial_size: f64,
    pub remaining_fraction: f64,
    /// Token units still held
    pub remaining_size: f64,
    pub peak_multiple: f64,
    pub current_multiple: Option<f64>,
    pub ladder_rungs_hit: Vec<usize>,
    pub trailing_active: bool,
    pub trailing_floor: f64,
    pub reentry_count: u32,
    pub has_pending_decision: bool,
    pub exit_reason: Option<ExitReason>,
    pub realized_pnl: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
}
