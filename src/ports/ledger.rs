use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::signal::SignalAction;
use crate::domain::trade::{NewTrade, TradeRecord, TradeStatus};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O failure: {0}")]
    Io(String),

    #[error("ledger serialization failure: {0}")]
    Serialization(String),

    #[error("no trade with id {0}")]
    UnknownTrade(u64),
}

/// One row of per-strategy signal history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEntry {
    pub strategy: String,
    pub symbol: String,
    pub action: SignalAction,
    pub confidence: f64,
    pub executed: bool,
    pub recorded_at: DateTime<Utc>,
}

impl SignalEntry {
    pub fn new(
        strategy: &str,
        symbol: &str,
        action: SignalAction,
        confidence: f64,
        executed: bool,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            symbol: symbol.to_string(),
            action,
            confidence,
            executed,
            recorded_at: Utc::now(),
        }
    }
}

/// Append/query store for trade records, portfolio snapshots, and
/// per-strategy signal history.
///
/// Every append must be durable before the call returns. Status updates
/// must be idempotent for terminal states: once a record has reached a
/// terminal status, a repeat update with the same status is a no-op and no
/// update may regress the persisted state.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Persist a new trade record and return its assigned id
    async fn create_trade(&self, trade: NewTrade) -> Result<u64, LedgerError>;

    /// Transition a trade record. `broker_order_id` only overwrites when
    /// provided.
    async fn update_trade_status(
        &self,
        id: u64,
        status: TradeStatus,
        executed_at: Option<DateTime<Utc>>,
        broker_order_id: Option<String>,
    ) -> Result<(), LedgerError>;

    async fn append_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<(), LedgerError>;

    async fn record_signal(&self, entry: SignalEntry) -> Result<(), LedgerError>;

    /// Most recent trades, newest first
    async fn recent_trades(&self, limit: usize) -> Result<Vec<TradeRecord>, LedgerError>;

    /// Snapshots taken within the last `since_days` days, newest first
    async fn portfolio_history(&self, since_days: u32)
        -> Result<Vec<PortfolioSnapshot>, LedgerError>;
}
