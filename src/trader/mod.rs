//! Trader module - exit policy, re-entry, and execution orchestration
//!
//! ## Architecture
//!
//! ```text
//! PriceSource → Monitor → RiskEngine (tick) → Decision → Executor → fill → RiskEngine
//! ```
//!
//! **Exit:** ladder, trailing stop and stop-loss rules (pure)
//! **Re-entry:** bounded buy-back after a profitable exit
//! **Executors:** trade execution behind the `Executor` trait
//! **Monitors:** per-token polling loops (orchestration only)
//!
//! ## Module Structure
//!
//! - `exit/`: `LadderPolicy`, `TrailingStopTracker`, stop-loss floor
//! - `reentry`: `ReentryController` and its per-token counters
//! - `executors/`: `Executor` trait, dry-run executor
//! - `monitors/`: price polling loops
//! - `config`: validated `RiskSettings`
//! - `constants`: tolerances and intervals
//! - `types`: decisions, orders, fills

pub mod config;
pub mod constants;
pub mod executors;
pub mod exit;
pub mod monitors;
pub mod reentry;
pub mod types;

// Re-exports for common usage
pub use config::{ReentrySettings, RiskSettings};
pub use constants::*;
pub use executors::{DryRunExecutor, Executor};
pub use monitors::{MonitorOutcome, MonitorSettings};
pub use reentry::{ReentryController, ReentryWatch, WatchState};
pub use types::{BuyFill, BuyOrder, Decision, ExitReason, SellFill, SellOrder};
