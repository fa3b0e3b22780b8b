//! Position registry and the engine's external surface
//!
//! Each position lives behind its own `tokio::sync::Mutex`, so ticks and
//! fills for one position are strictly serialized while different positions
//! proceed concurrently. The re-entry controller has its own mutex and is
//! never locked while a position lock is held.

use super::apply::{apply_transition, ApplyEffects};
use super::machine::{evaluate_tick, issue_sell_all};
use super::transitions::PositionTransition;
use super::types::{Position, PositionId, PositionSnapshot};
use crate::errors::{PositionError, TickError};
use crate::logger::{self, LogTag};
use crate::trader::config::RiskSettings;
use crate::trader::reentry::ReentryController;
use crate::trader::types::{BuyFill, Decision, ExitReason, SellFill, SellOrder};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Details of a position that just closed, gathered under its lock
struct ClosedExit {
    mint: String,
    reason: ExitReason,
    exit_price: f64,
    initial_size: f64,
    filled_at: DateTime<Utc>,
}

pub struct RiskEngine {
    settings: Arc<RiskSettings>,
    positions: RwLock<HashMap<PositionId, Arc<Mutex<Position>>>>,
    /// Open (not yet closed) position per token
    active_by_mint: RwLock<HashMap<String, PositionId>>,
    reentry: Mutex<ReentryController>,
    next_id: AtomicU64,
}

impl RiskEngine {
    pub fn new(settings: RiskSettings) -> Self {
        let reentry = ReentryController::new(settings.reentry.clone(), settings.fill_timeout);
        Self {
            settings: Arc::new(settings),
            positions: RwLock::new(HashMap::new()),
            active_by_mint: RwLock::new(HashMap::new()),
            reentry: Mutex::new(reentry),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &RiskSettings {
        &self.settings
    }

    // =========================================================================
    // OPENING
    // =========================================================================

    /// Open a position from a confirmed buy (signal or manual command)
    ///
    /// Supersedes any re-entry watch for the token. The token's re-entry
    /// counter carries over to the new position.
    pub async fn open_position(
        &self,
        mint: &str,
        size: f64,
        entry_price: f64,
    ) -> Result<PositionId, PositionError> {
        validate_entry(mint, size, entry_price)?;

        let mut by_mint = self.active_by_mint.write().await;
        if let Some(&position_id) = by_mint.get(mint) {
            return Err(PositionError::AlreadyOpen {
                mint: mint.to_string(),
                position_id,
            });
        }

        let reentry_count = {
            let mut reentry = self.reentry.lock().await;
            reentry.cancel(mint);
            reentry.count(mint)
        };

        let position_id = self.insert_position(mint, size, entry_price, reentry_count).await;
        by_mint.insert(mint.to_string(), position_id);
        Ok(position_id)
    }

    async fn insert_position(
        &self,
        mint: &str,
        size: f64,
        entry_price: f64,
        reentry_count: u32,
    ) -> PositionId {
        let position_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let position = Position::new(
            position_id,
            mint,
            size,
            entry_price,
            reentry_count,
            &self.settings,
            Utc::now(),
        );

        logger::info(
            LogTag::Positions,
            &format!(
                "Opened position {} for {}: size {} at {:.10} (re-entries used {})",
                position_id, mint, size, entry_price, reentry_count
            ),
        );

        self.positions
            .write()
            .await
            .insert(position_id, Arc::new(Mutex::new(position)));
        position_id
    }

    // =========================================================================
    // TICKS
    // =========================================================================

    /// Feed a fresh price for a token
    pub async fn tick(&self, mint: &str, price: f64) -> Result<Decision, TickError> {
        let now = Utc::now();
        self.tick_at(mint, price, now, now).await
    }

    /// Feed a price observed at `observed_at`, evaluated at `now`
    ///
    /// Routes to the token's open position, or to its re-entry watch once the
    /// position has closed.
    pub async fn tick_at(
        &self,
        mint: &str,
        price: f64,
        observed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Decision, TickError> {
        let result = match self.active_position(mint).await {
            Some(position) => {
                let mut position = position.lock().await;
                evaluate_tick(&mut position, price, observed_at, now, &self.settings)
            }
            None => self.observe_reentry(mint, price, observed_at, now).await,
        };

        if let Err(e) = &result {
            if e.is_data_quality() {
                logger::warning(LogTag::Pricing, &format!("Tick discarded: {}", e));
            }
        }
        result
    }

    async fn observe_reentry(
        &self,
        mint: &str,
        price: f64,
        observed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Decision, TickError> {
        let age = now - observed_at;
        if age > self.settings.price_max_age {
            return Err(TickError::StalePrice {
                mint: mint.to_string(),
                age_ms: age.num_milliseconds(),
            });
        }
        self.reentry.lock().await.observe(mint, price, now)
    }

    // =========================================================================
    // FILLS
    // =========================================================================

    /// Executor reports a sell of `fraction_filled` (share of the original size)
    pub async fn confirm_fill(
        &self,
        position_id: PositionId,
        fraction_filled: f64,
        fill_price: f64,
    ) -> Result<ApplyEffects, PositionError> {
        let fill = SellFill {
            fraction_of_original: fraction_filled,
            fill_price,
            filled_at: Utc::now(),
        };
        self.confirm_sell(position_id, fill).await
    }

    pub async fn confirm_sell(
        &self,
        position_id: PositionId,
        fill: SellFill,
    ) -> Result<ApplyEffects, PositionError> {
        let position = self.position(position_id).await?;

        let (effects, closed) = {
            let mut position = position.lock().await;
            let effects = apply_transition(
                &mut position,
                PositionTransition::SellFilled { fill },
                &self.settings,
            )?;
            let closed = if effects.position_closed {
                position.exit_reason.map(|reason| ClosedExit {
                    mint: position.mint.clone(),
                    reason,
                    exit_price: fill.fill_price,
                    initial_size: position.initial_size,
                    filled_at: fill.filled_at,
                })
            } else {
                None
            };
            (effects, closed)
        };

        if let Some(exit) = closed {
            self.retire_position(position_id, exit).await;
        }
        Ok(effects)
    }

    /// Executor refused the outstanding sell; the position is left as it was
    pub async fn reject_decision(&self, position_id: PositionId, reason: &str) -> Result<(), PositionError> {
        let position = self.position(position_id).await?;
        let mut position = position.lock().await;
        apply_transition(
            &mut position,
            PositionTransition::SellRejected {
                reason: reason.to_string(),
            },
            &self.settings,
        )?;
        Ok(())
    }

    /// Fail the outstanding sell after the fill timeout
    pub async fn expire_decision(&self, position_id: PositionId) -> Result<(), PositionError> {
        let position = self.position(position_id).await?;
        let mut position = position.lock().await;
        apply_transition(&mut position, PositionTransition::DecisionExpired, &self.settings)?;
        Ok(())
    }

    async fn retire_position(&self, position_id: PositionId, exit: ClosedExit) {
        {
            let mut by_mint = self.active_by_mint.write().await;
            if by_mint.get(&exit.mint) == Some(&position_id) {
                by_mint.remove(&exit.mint);
            }
        }

        self.reentry.lock().await.arm(
            &exit.mint,
            position_id,
            exit.reason,
            exit.exit_price,
            exit.initial_size,
            exit.filled_at,
        );
    }

    // =========================================================================
    // MANUAL CONTROLS
    // =========================================================================

    /// Exit the whole remaining position regardless of the exit policy
    ///
    /// A sell still awaiting its fill is never replaced: the call fails with
    /// `DecisionPending` until that sell is filled, rejected or expired. A
    /// decision older than the fill timeout is expired here first.
    pub async fn force_sell_all(&self, position_id: PositionId) -> Result<Decision, PositionError> {
        let position = self.position(position_id).await?;
        let mut position = position.lock().await;

        if position.is_closed() {
            return Err(PositionError::Closed(position_id));
        }

        let now = Utc::now();
        if let Some(pending) = &position.pending {
            if now - pending.issued_at < self.settings.fill_timeout {
                logger::warning(
                    LogTag::Positions,
                    &format!(
                        "Manual sell-all on position {} deferred: {} still awaiting fill",
                        position_id, pending.reason
                    ),
                );
                return Err(PositionError::DecisionPending(position_id));
            }
            apply_transition(&mut position, PositionTransition::DecisionExpired, &self.settings)?;
        }

        let price = position.last_price.unwrap_or(position.entry_price);
        let decision = issue_sell_all(&mut position, ExitReason::Manual, price, now);

        logger::info(
            LogTag::Positions,
            &format!(
                "Manual sell-all for position {} ({}), {:.1}% remaining",
                position_id,
                position.mint,
                position.remaining_fraction * 100.0
            ),
        );
        Ok(decision)
    }

    /// Emergency exit of every open position
    pub async fn force_sell_all_positions(&self) -> Vec<(PositionId, Result<Decision, PositionError>)> {
        let mut results = Vec::new();
        for position_id in self.open_position_ids().await {
            results.push((position_id, self.force_sell_all(position_id).await));
        }
        results
    }

    // =========================================================================
    // RE-ENTRY
    // =========================================================================

    /// Re-entry buy filled: open the fresh position at the fill price
    pub async fn confirm_reentry(&self, mint: &str, fill: BuyFill) -> Result<PositionId, PositionError> {
        validate_entry(mint, fill.size, fill.fill_price)?;

        let mut by_mint = self.active_by_mint.write().await;
        if let Some(&position_id) = by_mint.get(mint) {
            return Err(PositionError::AlreadyOpen {
                mint: mint.to_string(),
                position_id,
            });
        }

        let (watch, reentry_count) = {
            let mut reentry = self.reentry.lock().await;
            let watch = reentry.confirm(mint)?;
            (watch, reentry.count(mint))
        };

        logger::info(
            LogTag::Reentry,
            &format!(
                "Re-entered {} at {:.10} after position {} exited at {:.10}",
                mint, fill.fill_price, watch.source_position, watch.exit_price
            ),
        );

        let position_id = self
            .insert_position(mint, fill.size, fill.fill_price, reentry_count)
            .await;
        by_mint.insert(mint.to_string(), position_id);
        Ok(position_id)
    }

    pub async fn reject_reentry(&self, mint: &str, reason: &str) -> Result<(), PositionError> {
        self.reentry.lock().await.reject(mint, reason)
    }

    pub async fn reentry_count(&self, mint: &str) -> u32 {
        self.reentry.lock().await.count(mint)
    }

    pub async fn is_watching_reentry(&self, mint: &str) -> bool {
        self.reentry.lock().await.is_watching(mint)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Sell instruction for the position's outstanding decision
    pub async fn pending_sell_order(&self, position_id: PositionId) -> Option<SellOrder> {
        let position = self.position(position_id).await.ok()?;
        let position = position.lock().await;
        position.sell_order()
    }

    pub async fn position_snapshot(&self, position_id: PositionId) -> Option<PositionSnapshot> {
        let position = self.position(position_id).await.ok()?;
        let position = position.lock().await;
        Some(position.snapshot())
    }

    /// All positions ever opened, open and closed, ordered by id
    pub async fn snapshots(&self) -> Vec<PositionSnapshot> {
        let positions: Vec<Arc<Mutex<Position>>> =
            self.positions.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(positions.len());
        for position in positions {
            snapshots.push(position.lock().await.snapshot());
        }
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    pub async fn active_position_id(&self, mint: &str) -> Option<PositionId> {
        self.active_by_mint.read().await.get(mint).copied()
    }

    pub async fn open_position_ids(&self) -> Vec<PositionId> {
        let mut ids: Vec<PositionId> = self.active_by_mint.read().await.values().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Whether ticks for this token still matter (open position or re-entry watch)
    pub async fn is_monitored(&self, mint: &str) -> bool {
        if self.active_position_id(mint).await.is_some() {
            return true;
        }
        self.is_watching_reentry(mint).await
    }

    async fn position(&self, position_id: PositionId) -> Result<Arc<Mutex<Position>>, PositionError> {
        self.positions
            .read()
            .await
            .get(&position_id)
            .cloned()
            .ok_or(PositionError::NotFound(position_id))
    }

    async fn active_position(&self, mint: &str) -> Option<Arc<Mutex<Position>>> {
        let position_id = self.active_position_id(mint).await?;
        self.position(position_id).await.ok()
    }
}

fn validate_entry(mint: &str, size: f64, entry_price: f64) -> Result<(), PositionError> {
    if !size.is_finite() || size <= 0.0 || !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(PositionError::InvalidEntry {
            mint: mint.to_string(),
            size,
            entry_price,
        });
    }
    Ok(())
}
