//! REST Market Data Client
//!
//! Fetches historical closes and live quotes from a JSON quote API.
//! Endpoint shape:
//!   GET {base}/history?symbol=AAPL&days=365 -> { "symbol": ..., "bars": [{ "t": unix, "c": close }] }
//!   GET {base}/quote?symbol=AAPL           -> { "symbol": ..., "price": close }

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::ports::market_data::{MarketDataError, MarketDataSource, PricePoint};

#[derive(Debug, Clone)]
pub struct RestMarketData {
    http: Client,
    base_url: String,
    name: String,
}

impl RestMarketData {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MarketDataError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Transport(e.to_string()))?;

        // Host doubles as the display name in fallback-chain logs
        let name = base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('/')
            .next()
            .unwrap_or(base_url)
            .to_string();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            name,
        })
    }
}

#[async_trait]
impl MarketDataSource for RestMarketData {
    async fn price_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        let url = format!(
            "{}/history?symbol={}&days={}",
            self.base_url, symbol, lookback_days
        );

        let response: HistoryResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketDataError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        if response.bars.is_empty() {
            return Err(MarketDataError::NoData(symbol.to_string()));
        }

        let mut series = Vec::with_capacity(response.bars.len());
        for bar in response.bars {
            let timestamp = DateTime::from_timestamp(bar.t, 0)
                .ok_or_else(|| MarketDataError::Parse(format!("bad bar timestamp {}", bar.t)))?;
            series.push(PricePoint {
                timestamp,
                close: bar.c,
            });
        }
        series.sort_by_key(|p| p.timestamp);

        tracing::debug!(
            symbol,
            points = series.len(),
            source = %self.name,
            "fetched price history"
        );
        Ok(series)
    }

    async fn current_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        let url = format!("{}/quote?symbol={}", self.base_url, symbol);

        let response: QuoteResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MarketDataError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| MarketDataError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))?;

        match response.price {
            Some(price) if price > 0.0 => Ok(price),
            _ => Err(MarketDataError::NoData(symbol.to_string())),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[allow(dead_code)]
    symbol: String,
    bars: Vec<BarDto>,
}

#[derive(Debug, Deserialize)]
struct BarDto {
    /// Unix timestamp in seconds
    t: i64,
    /// Closing price
    c: f64,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[allow(dead_code)]
    symbol: String,
    price: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_and_name() {
        let client =
            RestMarketData::new("https://quotes.example.com/api/", Duration::from_secs(10))
                .unwrap();
        assert_eq!(client.name(), "quotes.example.com");
        assert_eq!(client.base_url, "https://quotes.example.com/api");
    }

    #[test]
    fn test_history_response_parses() {
        let json = r#"{"symbol":"AAPL","bars":[{"t":1700000000,"c":182.5},{"t":1700086400,"c":184.1}]}"#;
        let response: HistoryResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.bars.len(), 2);
        assert_eq!(response.bars[1].c, 184.1);
    }

    #[test]
    fn test_quote_response_handles_missing_price() {
        let json = r#"{"symbol":"AAPL","price":null}"#;
        let response: QuoteResponse = serde_json::from_str(json).unwrap();
        assert!(response.price.is_none());
    }
}
