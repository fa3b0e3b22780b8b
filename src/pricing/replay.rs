//! Recorded price tape
//!
//! Each call to `get_price` yields the next recorded price for that token,
//! stamped with the current time. Tapes are CSV `mint,price` with an
//! optional header row.

use super::{PriceQuote, PriceSource};
use crate::errors::PricingError;
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

pub struct ReplayPriceSource {
    tapes: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl ReplayPriceSource {
    /// Build from `(mint, price)` pairs, kept in order per token
    pub fn from_ticks<I, S>(ticks: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut tapes: HashMap<String, VecDeque<f64>> = HashMap::new();
        for (mint, price) in ticks {
            tapes.entry(mint.into()).or_default().push_back(price);
        }
        Self {
            tapes: Mutex::new(tapes),
        }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, PricingError> {
        let content = std::fs::read_to_string(path).map_err(|source| PricingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let source = Self::from_csv_str(&content)?;

        logger::info(
            LogTag::Pricing,
            &format!(
                "Loaded price tape {} ({} tokens)",
                path.display(),
                source.mints().len()
            ),
        );
        Ok(source)
    }

    /// Parse CSV content
    ///
    /// A first row whose price column is not a number is taken as a header.
    /// Prices are not validated here: bad ticks are the engine's to discard.
    pub fn from_csv_str(content: &str) -> Result<Self, PricingError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(content.as_bytes());

        let mut ticks = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let line = result
                .as_ref()
                .ok()
                .and_then(|record| record.position())
                .map(|position| position.line())
                .unwrap_or(index as u64 + 1);
            let record = result.map_err(|e| PricingError::InvalidRecord {
                line,
                message: e.to_string(),
            })?;

            if record.len() < 2 {
                return Err(PricingError::InvalidRecord {
                    line,
                    message: "expected 'mint,price'".to_string(),
                });
            }

            let mint = record[0].to_string();
            match record[1].parse::<f64>() {
                Ok(price) => ticks.push((mint, price)),
                Err(_) if index == 0 => continue,
                Err(e) => {
                    return Err(PricingError::InvalidRecord {
                        line,
                        message: format!("invalid price '{}': {}", &record[1], e),
                    })
                }
            }
        }

        Ok(Self::from_ticks(ticks))
    }

    /// Tokens present on the tape, sorted
    pub fn mints(&self) -> Vec<String> {
        let mut mints: Vec<String> = self.tapes.lock().keys().cloned().collect();
        mints.sort();
        mints
    }

    pub fn remaining(&self, mint: &str) -> usize {
        self.tapes.lock().get(mint).map(VecDeque::len).unwrap_or(0)
    }
}

#[async_trait]
impl PriceSource for ReplayPriceSource {
    async fn get_price(&self, mint: &str) -> Option<PriceQuote> {
        let price = self.tapes.lock().get_mut(mint)?.pop_front()?;
        Some(PriceQuote::now(price))
    }

    fn is_finished(&self, mint: &str) -> bool {
        self.remaining(mint) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_per_token() {
        let source = ReplayPriceSource::from_ticks(vec![("A", 1.0), ("B", 5.0), ("A", 2.0)]);

        assert_eq!(source.get_price("A").await.map(|q| q.price), Some(1.0));
        assert_eq!(source.get_price("A").await.map(|q| q.price), Some(2.0));
        assert!(source.is_finished("A"));
        assert!(!source.is_finished("B"));
        assert_eq!(source.get_price("A").await, None);
        assert_eq!(source.get_price("C").await, None);
    }

    #[test]
    fn test_csv_with_header_and_comments() {
        let content = "mint,price\n# launch\nMINT,1.0\nMINT, 2.5\nOTHER,0.1\n";
        let source = ReplayPriceSource::from_csv_str(content).unwrap();
        assert_eq!(source.mints(), vec!["MINT".to_string(), "OTHER".to_string()]);
        assert_eq!(source.remaining("MINT"), 2);
    }

    #[test]
    fn test_csv_without_header() {
        let source = ReplayPriceSource::from_csv_str("MINT,1.0\nMINT,1.1\n").unwrap();
        assert_eq!(source.remaining("MINT"), 2);
    }

    #[test]
    fn test_csv_bad_price_is_an_error() {
        let result = ReplayPriceSource::from_csv_str("MINT,1.0\nMINT,abc\n");
        assert!(matches!(result, Err(PricingError::InvalidRecord { .. })));

        let result = ReplayPriceSource::from_csv_str("MINT,1.0\nMINT\n");
        assert!(matches!(result, Err(PricingError::InvalidRecord { .. })));
    }

    #[test]
    fn test_csv_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tape.csv");
        std::fs::write(&path, "MINT,1.0\n").unwrap();
        let source = ReplayPriceSource::from_csv_path(&path).unwrap();
        assert_eq!(source.remaining("MINT"), 1);

        assert!(matches!(
            ReplayPriceSource::from_csv_path(&dir.path().join("missing.csv")),
            Err(PricingError::Io { .. })
        ));
    }
}
