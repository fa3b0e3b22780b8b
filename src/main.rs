use anyhow::{anyhow, Context};
use launchsniper::{
    arguments::{
        get_config_path, get_replay_path, is_positions_sell_all_enabled, patterns,
        print_debug_info, print_help,
    },
    config::{get_config_clone, load_config_from_path, CONFIG_FILE_PATH},
    logger::{self as logger, LogTag},
    positions::RiskEngine,
    pricing::{PriceSource, ReplayPriceSource},
    trader::{
        monitors::{execute_exit, spawn_monitors},
        BuyOrder, DryRunExecutor, Executor, MonitorSettings, RiskSettings,
    },
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Main entry point for launchsniper
///
/// Headless dry-run runner:
/// - Loads and validates the risk configuration (fatal on invalid ladder)
/// - Opens one position per token on the replay tape at its first price
/// - Replays the tape through the per-token monitors
/// - Optionally emergency-exits everything (--positions-sell-all)
/// - Prints position snapshots as JSON
#[tokio::main]
async fn main() {
    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    logger::info(LogTag::System, "launchsniper starting up...");
    print_debug_info();

    if let Err(e) = run().await {
        logger::error(LogTag::System, &format!("launchsniper failed: {:#}", e));
        logger::flush();
        std::process::exit(1);
    }

    logger::info(LogTag::System, "launchsniper completed successfully");
    logger::flush();
}

async fn run() -> anyhow::Result<()> {
    let config_path = get_config_path().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    load_config_from_path(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;
    let config = get_config_clone();

    let settings = RiskSettings::from_global_config()
        .context("Risk configuration is invalid, refusing to start")?;

    logger::info(
        LogTag::Config,
        &format!(
            "Risk settings: stop loss {}%, trailing {}%, ladder {} rungs ({:.0}% of size), re-entry {} (max {}, confirm +{}%)",
            settings.stop_loss_pct,
            settings.trailing_stop_pct,
            settings.ladder.len(),
            settings.ladder.total_fraction() * 100.0,
            if settings.reentry.enabled { "on" } else { "off" },
            settings.reentry.max_per_token,
            settings.reentry.confirm_pct
        ),
    );

    if !config.trader.enabled {
        logger::warning(LogTag::Trader, "Trader disabled in config, nothing to do");
        return Ok(());
    }
    if !config.trader.dry_run {
        logger::warning(
            LogTag::Trader,
            "Live execution is not wired in this build, running in dry-run mode",
        );
    }

    let replay_path = get_replay_path()
        .ok_or_else(|| anyhow!("--replay <prices.csv> is required (see --help)"))?;
    let tape = ReplayPriceSource::from_csv_path(Path::new(&replay_path))?;
    let mints = tape.mints();
    if mints.is_empty() {
        return Err(anyhow!("Price tape {} contains no ticks", replay_path));
    }

    let fill_timeout = settings.fill_timeout;
    let engine = Arc::new(RiskEngine::new(settings));
    let prices: Arc<dyn PriceSource> = Arc::new(tape);
    let executor: Arc<dyn Executor> = Arc::new(DryRunExecutor::new());

    // Simulated signal buys at each token's first tape price
    for mint in &mints {
        let Some(quote) = prices.get_price(mint).await else {
            continue;
        };
        let order = BuyOrder {
            mint: mint.clone(),
            size: config.trader.trade_size / quote.price,
            reference_price: quote.price,
        };
        let fill = executor
            .buy(&order)
            .await
            .with_context(|| format!("Entry buy for {} failed", mint))?;
        engine
            .open_position(mint, fill.size, fill.fill_price)
            .await
            .with_context(|| format!("Failed to open position for {}", mint))?;
    }

    // The tape drives time, so no delay between polls
    let monitor_settings = MonitorSettings {
        poll_interval: Duration::ZERO,
        fill_timeout: fill_timeout.to_std().unwrap_or(Duration::from_secs(30)),
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::warning(LogTag::System, "Shutdown signal received, stopping monitors");
            let _ = shutdown_tx.send(true);
        }
    });

    let handles = spawn_monitors(
        engine.clone(),
        prices.clone(),
        executor.clone(),
        mints,
        monitor_settings,
        shutdown_rx,
    );
    let (names, tasks): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
    for (mint, result) in names.iter().zip(futures::future::join_all(tasks).await) {
        match result {
            Ok(outcome) => logger::info(
                LogTag::Monitor,
                &format!("{}: {:?}", mint, outcome),
            ),
            Err(e) => logger::error(
                LogTag::Monitor,
                &format!("Monitor task for {} failed: {}", mint, e),
            ),
        }
    }

    if is_positions_sell_all_enabled() {
        logger::warning(LogTag::Positions, "Emergency exit of all open positions");
        for (position_id, result) in engine.force_sell_all_positions().await {
            match result {
                Ok(_) => {
                    execute_exit(&engine, executor.as_ref(), position_id, &monitor_settings).await
                }
                Err(e) => logger::error(
                    LogTag::Positions,
                    &format!("Cannot exit position {}: {}", position_id, e),
                ),
            }
        }
    }

    let snapshots = engine.snapshots().await;
    let realized: f64 = snapshots.iter().map(|s| s.realized_pnl).sum();
    let still_open = snapshots.iter().filter(|s| !s.phase.is_terminal()).count();
    logger::info(
        LogTag::Positions,
        &format!(
            "{} positions ({} still open), realized pnl {:.6}",
            snapshots.len(),
            still_open,
            realized
        ),
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&snapshots).context("Failed to serialize snapshots")?
    );
    Ok(())
}
