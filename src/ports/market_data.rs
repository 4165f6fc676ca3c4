use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One historical observation: closing price at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("no price data for symbol {0}")]
    NoData(String),

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("all sources failed for {symbol}: {detail}")]
    AllSourcesFailed { symbol: String, detail: String },
}

/// Market data port: historical closes and live quotes
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Ordered (oldest first) closing prices covering the lookback window
    async fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError>;

    /// Most recent traded price
    async fn current_price(&self, symbol: &str) -> Result<f64, MarketDataError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Ordered fallback chain over several sources.
///
/// Each source is tried in turn; the first success wins and every failure
/// is carried into the final error, so a fully degraded chain reports what
/// went wrong at every hop instead of swallowing the causes.
pub struct ChainedMarketData {
    sources: Vec<Arc<dyn MarketDataSource>>,
}

impl ChainedMarketData {
    pub fn new(sources: Vec<Arc<dyn MarketDataSource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl MarketDataSource for ChainedMarketData {
    async fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.price_history(symbol, lookback_days).await {
                Ok(series) => return Ok(series),
                Err(e) => {
                    tracing::warn!(
                        symbol,
                        source = source.name(),
                        error = %e,
                        "price history source failed, trying next"
                    );
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(MarketDataError::AllSourcesFailed {
            symbol: symbol.to_string(),
            detail: failures.join("; "),
        })
    }

    async fn current_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        let mut failures = Vec::new();
        for source in &self.sources {
            match source.current_price(symbol).await {
                Ok(price) => return Ok(price),
                Err(e) => {
                    tracing::warn!(
                        symbol,
                        source = source.name(),
                        error = %e,
                        "quote source failed, trying next"
                    );
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        Err(MarketDataError::AllSourcesFailed {
            symbol: symbol.to_string(),
            detail: failures.join("; "),
        })
    }

    fn name(&self) -> &str {
        "chained"
    }
}
