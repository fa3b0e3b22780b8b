//! Bounded re-entry after a profitable full exit
//!
//! The controller owns the per-token re-entry counters and the bounce watches
//! armed after eligible exits. A watch emits `Reenter` at most once, when the
//! price recovers `confirm_pct` percent above the exit fill price inside the
//! observation window. Stop-loss and manual exits never arm a watch.

use crate::arguments::is_debug_reentry_enabled;
use crate::errors::{PositionError, TickError};
use crate::logger::{self, LogTag};
use crate::positions::PositionId;
use crate::trader::config::ReentrySettings;
use crate::trader::constants::MULTIPLE_EPSILON;
use crate::trader::types::{Decision, ExitReason};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum WatchState {
    /// Waiting for the bounce
    Watching,
    /// `Reenter` emitted, buy fill outstanding
    AwaitingFill { issued_at: DateTime<Utc> },
}

/// Bounce watch for one token after a full exit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReentryWatch {
    pub mint: String,
    pub source_position: PositionId,
    pub exit_reason: ExitReason,
    pub exit_price: f64,
    pub trigger_price: f64,
    /// Token units to buy back (original size of the exited position)
    pub size: f64,
    pub armed_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub state: WatchState,
}

pub struct ReentryController {
    settings: ReentrySettings,
    fill_timeout: Duration,
    counts: HashMap<String, u32>,
    watches: HashMap<String, ReentryWatch>,
}

impl ReentryController {
    pub fn new(settings: ReentrySettings, fill_timeout: Duration) -> Self {
        Self {
            settings,
            fill_timeout,
            counts: HashMap::new(),
            watches: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &ReentrySettings {
        &self.settings
    }

    /// Re-entries already emitted for this token
    pub fn count(&self, mint: &str) -> u32 {
        self.counts.get(mint).copied().unwrap_or(0)
    }

    pub fn can_reenter(&self, mint: &str) -> bool {
        self.settings.enabled && self.count(mint) < self.settings.max_per_token
    }

    pub fn is_watching(&self, mint: &str) -> bool {
        self.watches.contains_key(mint)
    }

    /// Arm a watch after a full exit; returns whether one was armed
    pub fn arm(
        &mut self,
        mint: &str,
        source_position: PositionId,
        exit_reason: ExitReason,
        exit_price: f64,
        size: f64,
        now: DateTime<Utc>,
    ) -> bool {
        if !exit_reason.allows_reentry() {
            if is_debug_reentry_enabled() {
                logger::debug(
                    LogTag::Reentry,
                    &format!("No re-entry for {} after {} exit", mint, exit_reason),
                );
            }
            return false;
        }

        if !self.can_reenter(mint) {
            logger::info(
                LogTag::Reentry,
                &format!(
                    "Re-entry not armed for {}: enabled={}, used {}/{}",
                    mint,
                    self.settings.enabled,
                    self.count(mint),
                    self.settings.max_per_token
                ),
            );
            return false;
        }

        if !exit_price.is_finite() || exit_price <= 0.0 || !size.is_finite() || size <= 0.0 {
            logger::warning(
                LogTag::Reentry,
                &format!(
                    "Re-entry not armed for {}: invalid exit price {} or size {}",
                    mint, exit_price, size
                ),
            );
            return false;
        }

        let trigger_price = exit_price * (1.0 + self.settings.confirm_pct / 100.0);
        let watch = ReentryWatch {
            mint: mint.to_string(),
            source_position,
            exit_reason,
            exit_price,
            trigger_price,
            size,
            armed_at: now,
            deadline: now
                .checked_add_signed(self.settings.window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            state: WatchState::Watching,
        };

        logger::info(
            LogTag::Reentry,
            &format!(
                "Watching {} for re-entry: exit {:.10}, trigger {:.10} (+{}%), window {}s",
                mint,
                exit_price,
                trigger_price,
                self.settings.confirm_pct,
                self.settings.window.num_seconds()
            ),
        );

        self.watches.insert(mint.to_string(), watch);
        true
    }

    /// Feed a price to the watch for `mint`
    ///
    /// Returns `Reenter` once when the bounce is confirmed. An expired window
    /// retires the watch and yields `Hold`.
    pub fn observe(&mut self, mint: &str, price: f64, now: DateTime<Utc>) -> Result<Decision, TickError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(TickError::InvalidPrice {
                mint: mint.to_string(),
                price,
            });
        }

        let watch = self.watches.get(mint).ok_or_else(|| TickError::UnknownToken {
            mint: mint.to_string(),
        })?;

        match watch.state {
            WatchState::AwaitingFill { issued_at } => {
                if now - issued_at < self.fill_timeout {
                    return Err(TickError::DecisionPending {
                        position_id: watch.source_position,
                    });
                }
                logger::warning(
                    LogTag::Reentry,
                    &format!("Re-entry buy for {} never confirmed, retiring token", mint),
                );
                self.watches.remove(mint);
                return Ok(Decision::Hold);
            }
            WatchState::Watching => {}
        }

        if now > watch.deadline {
            logger::info(
                LogTag::Reentry,
                &format!(
                    "No bounce for {} within {}s (needed {:.10}), retiring token",
                    mint,
                    self.settings.window.num_seconds(),
                    watch.trigger_price
                ),
            );
            self.watches.remove(mint);
            return Ok(Decision::Hold);
        }

        if price + MULTIPLE_EPSILON * watch.trigger_price < watch.trigger_price {
            if is_debug_reentry_enabled() {
                logger::debug(
                    LogTag::Reentry,
                    &format!(
                        "{} at {:.10}, waiting for {:.10}",
                        mint, price, watch.trigger_price
                    ),
                );
            }
            return Ok(Decision::Hold);
        }

        if !self.can_reenter(mint) {
            self.watches.remove(mint);
            return Ok(Decision::Hold);
        }

        let size = watch.size;
        let count = self.counts.entry(mint.to_string()).or_insert(0);
        *count += 1;
        let used = *count;

        if let Some(watch) = self.watches.get_mut(mint) {
            watch.state = WatchState::AwaitingFill { issued_at: now };
        }

        logger::info(
            LogTag::Reentry,
            &format!(
                "Bounce confirmed for {} at {:.10}: re-entering with {} tokens ({}/{})",
                mint, price, size, used, self.settings.max_per_token
            ),
        );

        Ok(Decision::Reenter { size })
    }

    /// Buy filled: the watch is done, the caller opens the new position
    pub fn confirm(&mut self, mint: &str) -> Result<ReentryWatch, PositionError> {
        match self.watches.get(mint) {
            Some(watch) if matches!(watch.state, WatchState::AwaitingFill { .. }) => self
                .watches
                .remove(mint)
                .ok_or_else(|| PositionError::NoReentryPending(mint.to_string())),
            _ => Err(PositionError::NoReentryPending(mint.to_string())),
        }
    }

    /// Buy rejected: the attempt stays counted and the token is retired
    pub fn reject(&mut self, mint: &str, reason: &str) -> Result<(), PositionError> {
        match self.watches.get(mint) {
            Some(watch) if matches!(watch.state, WatchState::AwaitingFill { .. }) => {
                self.watches.remove(mint);
                logger::warning(
                    LogTag::Reentry,
                    &format!("Re-entry buy for {} rejected ({}), retiring token", mint, reason),
                );
                Ok(())
            }
            _ => Err(PositionError::NoReentryPending(mint.to_string())),
        }
    }

    /// Drop any watch for `mint` (a fresh open supersedes it)
    pub fn cancel(&mut self, mint: &str) -> Option<ReentryWatch> {
        let removed = self.watches.remove(mint);
        if removed.is_some() && is_debug_reentry_enabled() {
            logger::debug(LogTag::Reentry, &format!("Re-entry watch for {} cancelled", mint));
        }
        removed
    }
}
