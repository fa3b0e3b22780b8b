//! End-to-end exit scenarios driven through the `RiskEngine` surface.
//!
//! Each test feeds a price path tick by tick and confirms fills the way an
//! executor would, then checks decisions and the resulting position state.

use launchsniper::config::Config;
use launchsniper::errors::TickError;
use launchsniper::positions::{PositionId, PositionPhase, RiskEngine};
use launchsniper::trader::{BuyFill, Decision, ExitReason, RiskSettings};
use chrono::Utc;

const LADDER: &str = "2x:30,5x:20,10x:10,15x:15,20x:15";

fn engine_with(ladder: &str, max_reentries: u32) -> RiskEngine {
    let mut config = Config::default();
    config.trader.tp_ladder = ladder.to_string();
    config.trader.trailing_stop_pct = 15.0;
    config.trader.stop_loss_pct = -30.0;
    config.trader.reentry_enabled = true;
    config.trader.reentry_confirm_pct = 7.0;
    config.trader.max_reentries_per_token = max_reentries;
    RiskEngine::new(RiskSettings::from_config(&config).expect("valid settings"))
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Confirm the outstanding sell completely at `price`
async fn fill(engine: &RiskEngine, id: PositionId, price: f64) {
    let order = engine.pending_sell_order(id).await.expect("pending sell");
    let fraction = order.remaining_fraction * order.fraction_of_remaining;
    engine.confirm_fill(id, fraction, price).await.expect("fill applied");
}

#[tokio::test]
async fn ladder_fires_lowest_rung_only_and_defers_trailing() {
    let engine = engine_with(LADDER, 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    assert_eq!(engine.tick("MINT", 1.00).await, Ok(Decision::Hold));
    // -25% is above the -30% floor
    assert_eq!(engine.tick("MINT", 0.75).await, Ok(Decision::Hold));

    let decision = engine.tick("MINT", 2.1).await.unwrap();
    match decision {
        Decision::Sell {
            fraction_of_remaining,
            reason,
        } => {
            assert!(approx(fraction_of_remaining, 0.30));
            assert_eq!(reason, ExitReason::TakeProfit { rung: 0, multiple: 2.0 });
        }
        other => panic!("expected 2x rung sell, got {:?}", other),
    }
    fill(&engine, id, 2.1).await;

    // Jump past 5x: only the 5x rung fires, 10x is not reached
    let decision = engine.tick("MINT", 6.0).await.unwrap();
    match decision {
        Decision::Sell {
            fraction_of_remaining,
            reason,
        } => {
            // 20% of original out of 70% held
            assert!(approx(fraction_of_remaining, 0.2 / 0.7));
            assert_eq!(reason, ExitReason::TakeProfit { rung: 1, multiple: 5.0 });
        }
        other => panic!("expected 5x rung sell, got {:?}", other),
    }
    fill(&engine, id, 6.0).await;

    // 5.1 is exactly the 15% trailing floor from 6.0, but rungs remain
    assert_eq!(engine.tick("MINT", 5.1).await, Ok(Decision::Hold));

    let snapshot = engine.position_snapshot(id).await.unwrap();
    assert_eq!(snapshot.phase, PositionPhase::PartiallyExited);
    assert!(approx(snapshot.remaining_fraction, 0.5));
    assert_eq!(snapshot.ladder_rungs_hit, vec![0, 1]);
    assert!(approx(snapshot.peak_multiple, 6.0));
    assert!(!snapshot.trailing_active);
}

#[tokio::test]
async fn exhausted_ladder_exits_on_trailing_floor() {
    let engine = engine_with(LADDER, 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    for price in [2.0, 5.0, 10.0, 15.0, 20.0] {
        let decision = engine.tick("MINT", price).await.unwrap();
        assert!(matches!(
            decision.exit_reason(),
            Some(ExitReason::TakeProfit { .. })
        ));
        fill(&engine, id, price).await;
    }

    let snapshot = engine.position_snapshot(id).await.unwrap();
    assert_eq!(snapshot.phase, PositionPhase::TrailingOnly);
    assert!(snapshot.trailing_active);
    assert!(approx(snapshot.remaining_fraction, 0.10));
    assert!(approx(snapshot.trailing_floor, 17.0));

    assert_eq!(engine.tick("MINT", 18.0).await, Ok(Decision::Hold));
    assert_eq!(
        engine.tick("MINT", 17.0).await,
        Ok(Decision::SellAll {
            reason: ExitReason::TrailingStop
        })
    );
    fill(&engine, id, 17.0).await;

    let snapshot = engine.position_snapshot(id).await.unwrap();
    assert_eq!(snapshot.phase, PositionPhase::Exited);
    assert_eq!(snapshot.remaining_fraction, 0.0);
    assert_eq!(snapshot.exit_reason, Some(ExitReason::TrailingStop));
}

#[tokio::test]
async fn direct_drop_stops_out_without_ladder_sells() {
    let engine = engine_with(LADDER, 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    assert_eq!(
        engine.tick("MINT", 0.65).await,
        Ok(Decision::SellAll {
            reason: ExitReason::StopLoss
        })
    );
    fill(&engine, id, 0.65).await;

    let snapshot = engine.position_snapshot(id).await.unwrap();
    assert_eq!(snapshot.phase, PositionPhase::StoppedOut);
    assert!(snapshot.ladder_rungs_hit.is_empty());
    assert!(snapshot.realized_pnl < 0.0);

    // No re-entry after a stop loss, however hard the token bounces
    assert!(matches!(
        engine.tick("MINT", 5.0).await,
        Err(TickError::UnknownToken { .. })
    ));
    assert_eq!(engine.reentry_count("MINT").await, 0);
}

#[tokio::test]
async fn stop_loss_boundary_is_inclusive() {
    let engine = engine_with(LADDER, 1);
    engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    assert_eq!(engine.tick("MINT", 0.71).await, Ok(Decision::Hold));
    assert_eq!(
        engine.tick("MINT", 0.70).await,
        Ok(Decision::SellAll {
            reason: ExitReason::StopLoss
        })
    );
}

#[tokio::test]
async fn pending_sell_blocks_further_ticks() {
    let engine = engine_with(LADDER, 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    engine.tick("MINT", 2.5).await.unwrap();
    assert_eq!(
        engine.tick("MINT", 0.5).await,
        Err(TickError::DecisionPending { position_id: id })
    );

    // Expired decisions are dropped and the next tick is evaluated fresh
    engine.expire_decision(id).await.unwrap();
    assert_eq!(
        engine.tick("MINT", 0.5).await,
        Ok(Decision::SellAll {
            reason: ExitReason::StopLoss
        })
    );
}

#[tokio::test]
async fn partial_and_over_fills_reconcile_against_actual_amounts() {
    let engine = engine_with(LADDER, 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    engine.tick("MINT", 2.0).await.unwrap();
    let effects = engine.confirm_fill(id, 0.1, 2.0).await.unwrap();
    assert!(approx(effects.shortfall.unwrap(), 0.2));

    let snapshot = engine.position_snapshot(id).await.unwrap();
    assert!(approx(snapshot.remaining_fraction, 0.9));
    // The rung is consumed even though it under-filled
    assert_eq!(engine.tick("MINT", 2.5).await, Ok(Decision::Hold));

    engine.force_sell_all(id).await.unwrap();
    let effects = engine.confirm_fill(id, 1.5, 2.5).await.unwrap();
    assert!(approx(effects.overfill.unwrap(), 0.6));
    assert!(effects.position_closed);

    let snapshot = engine.position_snapshot(id).await.unwrap();
    assert_eq!(snapshot.remaining_fraction, 0.0);
    assert_eq!(snapshot.phase, PositionPhase::Exited);
}

#[tokio::test]
async fn reentry_after_trailing_exit_is_bounded() {
    let engine = engine_with("", 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    engine.tick("MINT", 4.0).await.unwrap();
    assert_eq!(
        engine.tick("MINT", 3.4).await,
        Ok(Decision::SellAll {
            reason: ExitReason::TrailingStop
        })
    );
    fill(&engine, id, 3.4).await;

    // Needs +7% over the 3.4 exit fill: 3.638
    assert_eq!(engine.tick("MINT", 3.2).await, Ok(Decision::Hold));
    assert_eq!(engine.tick("MINT", 3.6).await, Ok(Decision::Hold));
    assert_eq!(
        engine.tick("MINT", 3.7).await,
        Ok(Decision::Reenter { size: 1000.0 })
    );
    assert_eq!(engine.reentry_count("MINT").await, 1);

    let fill_report = BuyFill {
        size: 1000.0,
        fill_price: 3.7,
        filled_at: Utc::now(),
    };
    let second = engine.confirm_reentry("MINT", fill_report).await.unwrap();
    let snapshot = engine.position_snapshot(second).await.unwrap();
    assert_eq!(snapshot.entry_price, 3.7);
    assert_eq!(snapshot.remaining_fraction, 1.0);
    assert_eq!(snapshot.reentry_count, 1);

    // The re-entered position exits again, cap reached: token retired
    engine.tick("MINT", 7.4).await.unwrap();
    engine.tick("MINT", 5.0).await.unwrap();
    fill(&engine, second, 5.0).await;
    assert!(!engine.is_monitored("MINT").await);
    assert_eq!(engine.reentry_count("MINT").await, 1);
}

#[tokio::test]
async fn rejected_reentry_buy_retires_token() {
    let engine = engine_with("", 3);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();

    engine.tick("MINT", 4.0).await.unwrap();
    engine.tick("MINT", 3.0).await.unwrap();
    fill(&engine, id, 3.0).await;
    assert!(matches!(
        engine.tick("MINT", 4.0).await,
        Ok(Decision::Reenter { .. })
    ));

    engine.reject_reentry("MINT", "no route").await.unwrap();
    assert!(!engine.is_monitored("MINT").await);
    assert_eq!(engine.reentry_count("MINT").await, 1);
}

#[tokio::test]
async fn duplicate_open_is_rejected_while_position_active() {
    let engine = engine_with(LADDER, 1);
    let id = engine.open_position("MINT", 1000.0, 1.0).await.unwrap();
    assert!(engine.open_position("MINT", 10.0, 1.0).await.is_err());
    assert_eq!(engine.active_position_id("MINT").await, Some(id));
}
