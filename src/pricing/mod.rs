//! Price feed abstraction
//!
//! The engine consumes prices, it never fetches them. A `PriceSource` is
//! polled by the monitors; `None` means no quote right now (the monitor just
//! waits for the next poll).

mod replay;

pub use replay::ReplayPriceSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A price observation for one token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    /// When the source observed the price (staleness is judged from this)
    pub observed_at: DateTime<Utc>,
}

impl PriceQuote {
    pub fn new(price: f64, observed_at: DateTime<Utc>) -> Self {
        Self { price, observed_at }
    }

    pub fn now(price: f64) -> Self {
        Self::new(price, Utc::now())
    }
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest quote for `mint`, if one is available
    async fn get_price(&self, mint: &str) -> Option<PriceQuote>;

    /// True once the source will never produce another quote for `mint`
    fn is_finished(&self, _mint: &str) -> bool {
        false
    }
}
