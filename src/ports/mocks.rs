//! Recording mocks for the three ports.
//!
//! Deterministic in-memory implementations used by the integration suite:
//! they serve scripted responses and record every call so tests can assert
//! on the exact traffic the engine produced. No networking anywhere.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::signal::SignalAction;
use crate::domain::trade::{NewTrade, TradeRecord, TradeStatus};
use crate::ports::brokerage::{
    BrokerageClient, BrokerageError, OpenPositions, OrderReceipt, PortfolioView,
};
use crate::ports::ledger::{Ledger, LedgerError, SignalEntry};
use crate::ports::market_data::{MarketDataError, MarketDataSource, PricePoint};

/// Market data source that serves fixed series and quotes
#[derive(Debug, Default)]
pub struct StaticMarketData {
    histories: Mutex<HashMap<String, Vec<PricePoint>>>,
    quotes: Mutex<HashMap<String, f64>>,
    calls: Mutex<Vec<String>>,
}

impl StaticMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: fixed daily series ending today for a symbol
    pub fn with_history(self, symbol: &str, closes: &[f64]) -> Self {
        let start = Utc::now() - Duration::days(closes.len() as i64);
        let series = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                timestamp: start + Duration::days(i as i64),
                close,
            })
            .collect();
        self.histories
            .lock()
            .unwrap()
            .insert(symbol.to_string(), series);
        self
    }

    /// Builder method: fixed live quote for a symbol
    pub fn with_quote(self, symbol: &str, price: f64) -> Self {
        self.quotes
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
        self
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketData {
    async fn price_history(
        &self,
        symbol: &str,
        _lookback_days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.histories
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))
    }

    async fn current_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        self.quotes
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Market data source that always fails, for exercising fallback chains
#[derive(Debug)]
pub struct FailingMarketData {
    name: String,
}

impl FailingMarketData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl MarketDataSource for FailingMarketData {
    async fn price_history(
        &self,
        _symbol: &str,
        _lookback_days: u32,
    ) -> Result<Vec<PricePoint>, MarketDataError> {
        Err(MarketDataError::Transport("connection refused".to_string()))
    }

    async fn current_price(&self, _symbol: &str) -> Result<f64, MarketDataError> {
        Err(MarketDataError::Transport("connection refused".to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Brokerage client that records orders and serves scripted account state
#[derive(Debug)]
pub struct RecordingBroker {
    portfolio: Mutex<Option<PortfolioView>>,
    positions: Mutex<OpenPositions>,
    authenticated: AtomicBool,
    fail_orders: AtomicBool,
    orders: Mutex<Vec<(String, SignalAction, f64)>>,
    next_order: AtomicU64,
}

impl Default for RecordingBroker {
    fn default() -> Self {
        Self {
            portfolio: Mutex::new(None),
            positions: Mutex::new(OpenPositions::default()),
            authenticated: AtomicBool::new(true),
            fail_orders: AtomicBool::new(false),
            orders: Mutex::new(Vec::new()),
            next_order: AtomicU64::new(1),
        }
    }
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_portfolio(self, total_value: f64, buying_power: f64, day_change: f64) -> Self {
        *self.portfolio.lock().unwrap() = Some(PortfolioView {
            total_value,
            buying_power,
            day_change,
        });
        self
    }

    pub fn with_position(self, symbol: &str, quantity: f64) -> Self {
        {
            let mut positions = self.positions.lock().unwrap();
            positions.count += 1;
            positions.quantities.insert(symbol.to_string(), quantity);
        }
        self
    }

    pub fn unauthenticated(self) -> Self {
        self.authenticated.store(false, Ordering::SeqCst);
        self
    }

    pub fn failing_orders(self) -> Self {
        self.fail_orders.store(true, Ordering::SeqCst);
        self
    }

    pub fn placed_orders(&self) -> Vec<(String, SignalAction, f64)> {
        self.orders.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrokerageClient for RecordingBroker {
    async fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn portfolio(&self) -> Result<PortfolioView, BrokerageError> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(BrokerageError::NotAuthenticated);
        }
        self.portfolio
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BrokerageError::Transport("portfolio unavailable".to_string()))
    }

    async fn open_positions(&self) -> Result<OpenPositions, BrokerageError> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(BrokerageError::NotAuthenticated);
        }
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn place_order(
        &self,
        symbol: &str,
        action: SignalAction,
        dollar_amount: f64,
    ) -> Result<OrderReceipt, BrokerageError> {
        if !self.authenticated.load(Ordering::SeqCst) {
            return Err(BrokerageError::NotAuthenticated);
        }
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(BrokerageError::OrderFailed(
                "order rejected by broker".to_string(),
            ));
        }

        self.orders
            .lock()
            .unwrap()
            .push((symbol.to_string(), action, dollar_amount));

        let n = self.next_order.fetch_add(1, Ordering::SeqCst);
        Ok(OrderReceipt {
            broker_order_id: format!("mock-{}", n),
        })
    }
}

#[derive(Debug, Default)]
struct MemoryLedgerState {
    next_id: u64,
    trades: Vec<TradeRecord>,
    snapshots: Vec<PortfolioSnapshot>,
    signals: Vec<SignalEntry>,
}

/// In-memory ledger with the same update semantics as the durable one
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryLedgerState>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.state.lock().unwrap().trades.clone()
    }

    pub fn snapshots(&self) -> Vec<PortfolioSnapshot> {
        self.state.lock().unwrap().snapshots.clone()
    }

    pub fn signals(&self) -> Vec<SignalEntry> {
        self.state.lock().unwrap().signals.clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_trade(&self, trade: NewTrade) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.trades.push(TradeRecord {
            id,
            symbol: trade.symbol,
            action: trade.action,
            quantity: trade.quantity,
            price: trade.price,
            total_amount: trade.total_amount,
            strategy: trade.strategy,
            confidence: trade.confidence,
            reason: trade.reason,
            broker_order_id: None,
            status: trade.status,
            created_at: Utc::now(),
            executed_at: None,
        });
        Ok(id)
    }

    async fn update_trade_status(
        &self,
        id: u64,
        status: TradeStatus,
        executed_at: Option<DateTime<Utc>>,
        broker_order_id: Option<String>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LedgerError::UnknownTrade(id))?;

        // Terminal records never change again
        if record.status.is_terminal() {
            return Ok(());
        }

        record.status = status;
        if executed_at.is_some() {
            record.executed_at = executed_at;
        }
        if broker_order_id.is_some() {
            record.broker_order_id = broker_order_id;
        }
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<(), LedgerError> {
        self.state.lock().unwrap().snapshots.push(snapshot);
        Ok(())
    }

    async fn record_signal(&self, entry: SignalEntry) -> Result<(), LedgerError> {
        self.state.lock().unwrap().signals.push(entry);
        Ok(())
    }

    async fn recent_trades(&self, limit: usize) -> Result<Vec<TradeRecord>, LedgerError> {
        let state = self.state.lock().unwrap();
        Ok(state.trades.iter().rev().take(limit).cloned().collect())
    }

    async fn portfolio_history(
        &self,
        since_days: u32,
    ) -> Result<Vec<PortfolioSnapshot>, LedgerError> {
        let cutoff = Utc::now() - Duration::days(since_days as i64);
        let state = self.state.lock().unwrap();
        Ok(state
            .snapshots
            .iter()
            .rev()
            .filter(|s| s.timestamp >= cutoff)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_market_data_records_calls() {
        let source = StaticMarketData::new().with_history("AAPL", &[1.0, 2.0]);

        let series = source.price_history("AAPL", 30).await.unwrap();
        assert_eq!(series.len(), 2);
        assert!(source.price_history("TSLA", 30).await.is_err());
        assert_eq!(source.history_calls(), vec!["AAPL", "TSLA"]);
    }

    #[tokio::test]
    async fn test_recording_broker_orders() {
        let broker = RecordingBroker::new().with_portfolio(10_000.0, 5_000.0, 0.0);

        let receipt = broker
            .place_order("AAPL", SignalAction::Buy, 100.0)
            .await
            .unwrap();
        assert_eq!(receipt.broker_order_id, "mock-1");
        assert_eq!(
            broker.placed_orders(),
            vec![("AAPL".to_string(), SignalAction::Buy, 100.0)]
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_broker_refuses() {
        let broker = RecordingBroker::new().unauthenticated();
        assert!(!broker.is_authenticated().await);

        let err = broker
            .place_order("AAPL", SignalAction::Buy, 100.0)
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_memory_ledger_lifecycle() {
        let ledger = MemoryLedger::new();
        let id = ledger
            .create_trade(NewTrade::pending(
                "AAPL",
                SignalAction::Buy,
                0.5,
                200.0,
                100.0,
                "combined",
                0.8,
                "test",
            ))
            .await
            .unwrap();
        assert_eq!(id, 1);

        ledger
            .update_trade_status(
                id,
                TradeStatus::Executed,
                Some(Utc::now()),
                Some("ord-1".to_string()),
            )
            .await
            .unwrap();

        let trades = ledger.trades();
        assert_eq!(trades[0].status, TradeStatus::Executed);
        assert_eq!(trades[0].broker_order_id.as_deref(), Some("ord-1"));
    }

    #[tokio::test]
    async fn test_memory_ledger_terminal_update_is_noop() {
        let ledger = MemoryLedger::new();
        let id = ledger
            .create_trade(NewTrade::pending(
                "AAPL",
                SignalAction::Buy,
                0.5,
                200.0,
                100.0,
                "combined",
                0.8,
                "test",
            ))
            .await
            .unwrap();

        let first_time = Utc::now();
        ledger
            .update_trade_status(
                id,
                TradeStatus::Executed,
                Some(first_time),
                Some("ord-1".to_string()),
            )
            .await
            .unwrap();

        // A repeated terminal update must not regress anything
        ledger
            .update_trade_status(
                id,
                TradeStatus::Executed,
                Some(Utc::now()),
                Some("ord-2".to_string()),
            )
            .await
            .unwrap();

        let record = &ledger.trades()[0];
        assert_eq!(record.executed_at, Some(first_time));
        assert_eq!(record.broker_order_id.as_deref(), Some("ord-1"));
    }

    #[tokio::test]
    async fn test_recent_trades_newest_first() {
        let ledger = MemoryLedger::new();
        for symbol in ["AAPL", "MSFT", "TSLA"] {
            ledger
                .create_trade(NewTrade::pending(
                    symbol,
                    SignalAction::Buy,
                    1.0,
                    100.0,
                    100.0,
                    "combined",
                    0.9,
                    "test",
                ))
                .await
                .unwrap();
        }

        let recent = ledger.recent_trades(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].symbol, "TSLA");
        assert_eq!(recent[1].symbol, "MSFT");
    }
}
