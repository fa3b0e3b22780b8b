//! Trade execution
//!
//! The engine only emits decisions; an `Executor` carries them out and
//! reports what actually filled. Live swap routing is out of scope for this
//! crate, `DryRunExecutor` simulates fills for replays and tests.

mod dry_run;

pub use dry_run::DryRunExecutor;

use crate::errors::ExecutionError;
use crate::trader::types::{BuyFill, BuyOrder, SellFill, SellOrder};
use async_trait::async_trait;

#[async_trait]
pub trait Executor: Send + Sync {
    /// Executor name for logs
    fn name(&self) -> &str;

    /// Sell `order.fraction_of_remaining` of current holdings
    async fn sell(&self, order: &SellOrder) -> Result<SellFill, ExecutionError>;

    /// Buy `order.size` token units
    async fn buy(&self, order: &BuyOrder) -> Result<BuyFill, ExecutionError>;
}
