//! Simulated execution at the decision's reference price

use super::Executor;
use crate::arguments::is_debug_executor_enabled;
use crate::errors::ExecutionError;
use crate::logger::{self, LogTag};
use crate::trader::types::{BuyFill, BuyOrder, SellFill, SellOrder};
use async_trait::async_trait;
use chrono::Utc;

/// Fills orders without touching a market
///
/// By default every order fills completely at its reference price. A fill
/// ratio below 1 simulates thin liquidity; `rejecting` refuses every order.
#[derive(Debug, Clone)]
pub struct DryRunExecutor {
    fill_ratio: f64,
    reject_reason: Option<String>,
}

impl Default for DryRunExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self {
            fill_ratio: 1.0,
            reject_reason: None,
        }
    }

    /// Fill only this share of each sell (clamped to [0, 1])
    pub fn with_fill_ratio(fill_ratio: f64) -> Self {
        Self {
            fill_ratio: fill_ratio.clamp(0.0, 1.0),
            reject_reason: None,
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            fill_ratio: 0.0,
            reject_reason: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl Executor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn sell(&self, order: &SellOrder) -> Result<SellFill, ExecutionError> {
        if let Some(reason) = &self.reject_reason {
            return Err(ExecutionError::Rejected(reason.clone()));
        }

        let tokens = order.token_amount() * self.fill_ratio;
        if is_debug_executor_enabled() {
            logger::debug(
                LogTag::Executor,
                &format!(
                    "[DRY RUN] Sell {:.6} of {} tokens of {} at {:.10} ({})",
                    tokens,
                    order.initial_size,
                    order.mint,
                    order.reference_price,
                    order.reason
                ),
            );
        }

        Ok(SellFill::from_tokens(
            tokens,
            order.initial_size,
            order.reference_price,
        ))
    }

    async fn buy(&self, order: &BuyOrder) -> Result<BuyFill, ExecutionError> {
        if let Some(reason) = &self.reject_reason {
            return Err(ExecutionError::Rejected(reason.clone()));
        }

        if is_debug_executor_enabled() {
            logger::debug(
                LogTag::Executor,
                &format!(
                    "[DRY RUN] Buy {} tokens of {} at {:.10}",
                    order.size, order.mint, order.reference_price
                ),
            );
        }

        Ok(BuyFill {
            size: order.size,
            fill_price: order.reference_price,
            filled_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trader::types::ExitReason;

    fn order() -> SellOrder {
        SellOrder {
            position_id: 1,
            mint: "MINT".to_string(),
            fraction_of_remaining: 0.5,
            remaining_fraction: 0.6,
            initial_size: 100.0,
            reason: ExitReason::TrailingStop,
            reference_price: 3.0,
        }
    }

    #[tokio::test]
    async fn test_full_fill_at_reference_price() {
        let fill = DryRunExecutor::new().sell(&order()).await.unwrap();
        assert!((fill.fraction_of_original - 0.3).abs() < 1e-12);
        assert_eq!(fill.fill_price, 3.0);
    }

    #[tokio::test]
    async fn test_partial_fill_ratio() {
        let fill = DryRunExecutor::with_fill_ratio(0.5).sell(&order()).await.unwrap();
        assert!((fill.fraction_of_original - 0.15).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_rejecting_executor() {
        let executor = DryRunExecutor::rejecting("no route");
        assert!(matches!(
            executor.sell(&order()).await,
            Err(ExecutionError::Rejected(_))
        ));
        let buy = BuyOrder {
            mint: "MINT".to_string(),
            size: 10.0,
            reference_price: 1.0,
        };
        assert!(executor.buy(&buy).await.is_err());
    }
}
