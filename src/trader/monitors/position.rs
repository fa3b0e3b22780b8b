//! Per-token price polling loop
//!
//! Each loop handles:
//! - Polling the price source and feeding ticks to the engine
//! - Executing exit decisions and reporting fills, rejections, timeouts
//! - Executing re-entry buys
//! - Retiring the token once the engine no longer tracks it

use super::MonitorSettings;
use crate::arguments::is_debug_monitor_enabled;
use crate::errors::TickError;
use crate::logger::{self, LogTag};
use crate::positions::{PositionId, RiskEngine};
use crate::pricing::PriceSource;
use crate::trader::executors::Executor;
use crate::trader::types::{BuyOrder, Decision};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Why a token monitor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Position closed with no re-entry pending, or re-entry window over
    Retired,
    /// Price source has nothing more for the token
    FeedExhausted,
    Shutdown,
}

/// Run the monitor loop for one token until it is retired or shut down
pub async fn monitor_token(
    engine: Arc<RiskEngine>,
    prices: Arc<dyn PriceSource>,
    executor: Arc<dyn Executor>,
    mint: String,
    settings: MonitorSettings,
    mut shutdown: watch::Receiver<bool>,
) -> MonitorOutcome {
    logger::info(
        LogTag::Monitor,
        &format!("Starting monitor for {} (executor: {})", mint, executor.name()),
    );

    let outcome = loop {
        if *shutdown.borrow() {
            break MonitorOutcome::Shutdown;
        }

        if !engine.is_monitored(&mint).await {
            break MonitorOutcome::Retired;
        }

        match prices.get_price(&mint).await {
            Some(quote) => {
                let result = engine
                    .tick_at(&mint, quote.price, quote.observed_at, Utc::now())
                    .await;

                match result {
                    Ok(Decision::Hold) => {}
                    Ok(Decision::Reenter { size }) => {
                        let order = BuyOrder {
                            mint: mint.clone(),
                            size,
                            reference_price: quote.price,
                        };
                        execute_reentry(&engine, executor.as_ref(), &order, &settings).await;
                    }
                    Ok(_) => match engine.active_position_id(&mint).await {
                        Some(position_id) => {
                            execute_exit(&engine, executor.as_ref(), position_id, &settings).await;
                        }
                        None => logger::warning(
                            LogTag::Monitor,
                            &format!("Exit decision for {} but no active position", mint),
                        ),
                    },
                    Err(TickError::UnknownToken { .. }) | Err(TickError::PositionClosed { .. }) => {
                        break MonitorOutcome::Retired;
                    }
                    Err(e) => {
                        if is_debug_monitor_enabled() {
                            logger::debug(LogTag::Monitor, &format!("Tick skipped: {}", e));
                        }
                    }
                }
            }
            None => {
                if prices.is_finished(&mint) {
                    break MonitorOutcome::FeedExhausted;
                }
                if is_debug_monitor_enabled() {
                    logger::debug(LogTag::Monitor, &format!("No price for {} this poll", mint));
                }
            }
        }

        tokio::select! {
            _ = sleep(settings.poll_interval) => {},
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break MonitorOutcome::Shutdown;
                }
            }
        }
    };

    logger::info(
        LogTag::Monitor,
        &format!("Monitor for {} stopped: {:?}", mint, outcome),
    );
    outcome
}

/// Execute the position's outstanding sell and report the outcome to the engine
pub async fn execute_exit(
    engine: &RiskEngine,
    executor: &dyn Executor,
    position_id: PositionId,
    settings: &MonitorSettings,
) {
    let Some(order) = engine.pending_sell_order(position_id).await else {
        return;
    };

    logger::info(
        LogTag::Executor,
        &format!(
            "Selling {:.2}% of holdings of {} (position {}, {})",
            order.fraction_of_remaining * 100.0,
            order.mint,
            position_id,
            order.reason
        ),
    );

    let reported = match timeout(settings.fill_timeout, executor.sell(&order)).await {
        Ok(Ok(fill)) => engine.confirm_sell(position_id, fill).await.map(|effects| {
            if let Some(excess) = effects.overfill {
                logger::warning(
                    LogTag::Executor,
                    &format!(
                        "{} reported {:.6} more than position {} held",
                        executor.name(),
                        excess,
                        position_id
                    ),
                );
            }
        }),
        Ok(Err(e)) => {
            logger::warning(
                LogTag::Executor,
                &format!("Sell for position {} failed: {}", position_id, e),
            );
            engine.reject_decision(position_id, &e.to_string()).await
        }
        Err(_) => {
            logger::warning(
                LogTag::Executor,
                &format!(
                    "Sell for position {} timed out after {}s",
                    position_id,
                    settings.fill_timeout.as_secs()
                ),
            );
            engine.expire_decision(position_id).await
        }
    };

    if let Err(e) = reported {
        logger::error(
            LogTag::Executor,
            &format!("Failed to report sell outcome for position {}: {}", position_id, e),
        );
    }
}

/// Execute a re-entry buy and open the fresh position on fill
pub async fn execute_reentry(
    engine: &RiskEngine,
    executor: &dyn Executor,
    order: &BuyOrder,
    settings: &MonitorSettings,
) {
    let reported = match timeout(settings.fill_timeout, executor.buy(order)).await {
        Ok(Ok(fill)) => engine.confirm_reentry(&order.mint, fill).await.map(|_| ()),
        Ok(Err(e)) => engine.reject_reentry(&order.mint, &e.to_string()).await,
        Err(_) => engine.reject_reentry(&order.mint, "fill timeout").await,
    };

    if let Err(e) = reported {
        logger::error(
            LogTag::Executor,
            &format!("Failed to report re-entry outcome for {}: {}", order.mint, e),
        );
    }
}

pub fn spawn_token_monitor(
    engine: Arc<RiskEngine>,
    prices: Arc<dyn PriceSource>,
    executor: Arc<dyn Executor>,
    mint: String,
    settings: MonitorSettings,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<MonitorOutcome> {
    tokio::spawn(monitor_token(engine, prices, executor, mint, settings, shutdown))
}

/// One monitor task per token
pub fn spawn_monitors(
    engine: Arc<RiskEngine>,
    prices: Arc<dyn PriceSource>,
    executor: Arc<dyn Executor>,
    mints: Vec<String>,
    settings: MonitorSettings,
    shutdown: watch::Receiver<bool>,
) -> Vec<(String, JoinHandle<MonitorOutcome>)> {
    mints
        .into_iter()
        .map(|mint| {
            let handle = spawn_token_monitor(
                engine.clone(),
                prices.clone(),
                executor.clone(),
                mint.clone(),
                settings,
                shutdown.clone(),
            );
            (mint, handle)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::positions::PositionPhase;
    use crate::pricing::ReplayPriceSource;
    use crate::trader::config::RiskSettings;
    use crate::trader::executors::DryRunExecutor;
    use crate::trader::types::ExitReason;
    use std::time::Duration;

    fn setup(ladder: &str) -> (Arc<RiskEngine>, MonitorSettings) {
        let mut config = Config::default();
        config.trader.tp_ladder = ladder.to_string();
        config.trader.trailing_stop_pct = 15.0;
        config.trader.reentry_confirm_pct = 10.0;
        let settings = MonitorSettings {
            poll_interval: Duration::from_millis(1),
            fill_timeout: Duration::from_secs(5),
        };
        let engine = Arc::new(RiskEngine::new(RiskSettings::from_config(&config).unwrap()));
        (engine, settings)
    }

    #[tokio::test]
    async fn test_replay_runs_ladder_to_exit() {
        let (engine, settings) = setup("2x:30,5x:20");
        let id = engine.open_position("MINT", 100.0, 1.0).await.unwrap();
        let prices: Arc<dyn PriceSource> = Arc::new(ReplayPriceSource::from_ticks(vec![
            ("MINT", 1.0),
            ("MINT", 2.1),
            ("MINT", 6.0),
            ("MINT", 8.0),
            ("MINT", 6.5),
        ]));
        let executor: Arc<dyn Executor> = Arc::new(DryRunExecutor::new());
        let (_tx, rx) = watch::channel(false);

        let outcome = monitor_token(engine.clone(), prices, executor, "MINT".to_string(), settings, rx).await;

        let snapshot = engine.position_snapshot(id).await.unwrap();
        assert_eq!(snapshot.phase, PositionPhase::Exited);
        assert_eq!(snapshot.exit_reason, Some(ExitReason::TrailingStop));
        assert_eq!(snapshot.ladder_rungs_hit, vec![0, 1]);
        // Re-entry watch still armed when the tape ran out
        assert_eq!(outcome, MonitorOutcome::FeedExhausted);
    }

    #[tokio::test]
    async fn test_rejecting_executor_leaves_position_open() {
        let (engine, settings) = setup("2x:30");
        let id = engine.open_position("MINT", 100.0, 1.0).await.unwrap();
        let prices: Arc<dyn PriceSource> =
            Arc::new(ReplayPriceSource::from_ticks(vec![("MINT", 2.5), ("MINT", 2.6)]));
        let executor: Arc<dyn Executor> = Arc::new(DryRunExecutor::rejecting("no liquidity"));
        let (_tx, rx) = watch::channel(false);

        monitor_token(engine.clone(), prices, executor, "MINT".to_string(), settings, rx).await;

        let snapshot = engine.position_snapshot(id).await.unwrap();
        assert_eq!(snapshot.remaining_fraction, 1.0);
        assert!(snapshot.ladder_rungs_hit.is_empty());
        assert!(!snapshot.has_pending_decision);
    }

    #[tokio::test]
    async fn test_stop_loss_retires_token() {
        let (engine, settings) = setup("2x:30");
        engine.open_position("MINT", 100.0, 1.0).await.unwrap();
        let prices: Arc<dyn PriceSource> = Arc::new(ReplayPriceSource::from_ticks(vec![
            ("MINT", 0.6),
            ("MINT", 3.0),
        ]));
        let executor: Arc<dyn Executor> = Arc::new(DryRunExecutor::new());
        let (_tx, rx) = watch::channel(false);

        let outcome = monitor_token(engine.clone(), prices, executor, "MINT".to_string(), settings, rx).await;
        assert_eq!(outcome, MonitorOutcome::Retired);
        assert!(!engine.is_monitored("MINT").await);
    }

    #[tokio::test]
    async fn test_shutdown_stops_monitor() {
        let (engine, settings) = setup("2x:30");
        engine.open_position("MINT", 100.0, 1.0).await.unwrap();
        let prices: Arc<dyn PriceSource> = Arc::new(ReplayPriceSource::from_ticks(Vec::<(String, f64)>::new()));
        let executor: Arc<dyn Executor> = Arc::new(DryRunExecutor::new());
        let (tx, rx) = watch::channel(true);

        let outcome = monitor_token(engine, prices, executor, "MINT".to_string(), settings, rx).await;
        assert_eq!(outcome, MonitorOutcome::Shutdown);
        drop(tx);
    }
}
