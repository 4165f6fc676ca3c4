//! File Ledger
//!
//! Durable JSON-file implementation of the ledger port. The whole store is
//! one document; every append serializes the state to a sibling temp file,
//! fsyncs, then renames over the live file, so a crash mid-write never
//! leaves a torn ledger and an acknowledged append is on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::trade::{NewTrade, TradeRecord, TradeStatus};
use crate::ports::ledger::{Ledger, LedgerError, SignalEntry};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerState {
    next_trade_id: u64,
    trades: Vec<TradeRecord>,
    snapshots: Vec<PortfolioSnapshot>,
    signals: Vec<SignalEntry>,
}

pub struct FileLedger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl FileLedger {
    /// Open an existing ledger file or start an empty one
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| LedgerError::Io(e.to_string()))?;
            if content.trim().is_empty() {
                LedgerState::default()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| LedgerError::Serialization(e.to_string()))?
            }
        } else {
            LedgerState::default()
        };

        tracing::info!(
            path = %path.display(),
            trades = state.trades.len(),
            "ledger opened"
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Serialize the state and replace the live file atomically
    fn persist(&self, state: &LedgerState) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| LedgerError::Io(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&tmp_path).map_err(|e| LedgerError::Io(e.to_string()))?;
        file.write_all(content.as_bytes())
            .map_err(|e| LedgerError::Io(e.to_string()))?;
        file.sync_all().map_err(|e| LedgerError::Io(e.to_string()))?;

        fs::rename(&tmp_path, &self.path).map_err(|e| LedgerError::Io(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn create_trade(&self, trade: NewTrade) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().await;
        state.next_trade_id += 1;
        let id = state.next_trade_id;

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

        self.persist(&state)?;
        Ok(id)
    }

    async fn update_trade_status(
        &self,
        id: u64,
        status: TradeStatus,
        executed_at: Option<DateTime<Utc>>,
        broker_order_id: Option<String>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        let record = state
            .trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LedgerError::UnknownTrade(id))?;

        // Terminal records never change again; a repeated update with the
        // same terminal status is an acknowledged no-op.
        if record.status.is_terminal() {
            if record.status != status {
                tracing::warn!(
                    trade = id,
                    current = %record.status,
                    requested = %status,
                    "ignoring status update on terminal trade record"
                );
            }
            return Ok(());
        }

        record.status = status;
        if executed_at.is_some() {
            record.executed_at = executed_at;
        }
        if broker_order_id.is_some() {
            record.broker_order_id = broker_order_id;
        }

        self.persist(&state)?;
        tracing::info!(trade = id, status = %status, "trade record updated");
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: PortfolioSnapshot) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        state.snapshots.push(snapshot);
        self.persist(&state)
    }

    async fn record_signal(&self, entry: SignalEntry) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        state.signals.push(entry);
        self.persist(&state)
    }

    async fn recent_trades(&self, limit: usize) -> Result<Vec<TradeRecord>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.trades.iter().rev().take(limit).cloned().collect())
    }

    async fn portfolio_history(
        &self,
        since_days: u32,
    ) -> Result<Vec<PortfolioSnapshot>, LedgerError> {
        let cutoff = Utc::now() - Duration::days(since_days as i64);
        let state = self.state.lock().await;
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
    use crate::domain::signal::SignalAction;
    use tempfile::tempdir;

    fn sample_trade(symbol: &str) -> NewTrade {
        NewTrade::pending(
            symbol,
            SignalAction::Buy,
            0.5,
            200.0,
            100.0,
            "combined",
            0.8,
            "Buy consensus",
        )
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_ids() {
        let dir = tempdir().unwrap();
        let ledger = FileLedger::open(dir.path().join("ledger.json")).unwrap();

        assert_eq!(ledger.create_trade(sample_trade("AAPL")).await.unwrap(), 1);
        assert_eq!(ledger.create_trade(sample_trade("MSFT")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        {
            let ledger = FileLedger::open(&path).unwrap();
            let id = ledger.create_trade(sample_trade("AAPL")).await.unwrap();
            ledger
                .update_trade_status(
                    id,
                    TradeStatus::Executed,
                    Some(Utc::now()),
                    Some("ord-9".to_string()),
                )
                .await
                .unwrap();
            ledger
                .append_snapshot(PortfolioSnapshot::new(10_000.0, 4_000.0, 1, 25.0))
                .await
                .unwrap();
        }

        let reopened = FileLedger::open(&path).unwrap();
        let trades = reopened.recent_trades(10).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].status, TradeStatus::Executed);
        assert_eq!(trades[0].broker_order_id.as_deref(), Some("ord-9"));

        // Ids keep counting after a restart
        assert_eq!(
            reopened.create_trade(sample_trade("TSLA")).await.unwrap(),
            2
        );

        let history = reopened.portfolio_history(7).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_status_update_is_idempotent() {
        let dir = tempdir().unwrap();
        let ledger = FileLedger::open(dir.path().join("ledger.json")).unwrap();
        let id = ledger.create_trade(sample_trade("AAPL")).await.unwrap();

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

        ledger
            .update_trade_status(
                id,
                TradeStatus::Executed,
                Some(Utc::now()),
                Some("ord-2".to_string()),
            )
            .await
            .unwrap();

        let record = &ledger.recent_trades(1).await.unwrap()[0];
        assert_eq!(record.executed_at, Some(first_time));
        assert_eq!(record.broker_order_id.as_deref(), Some("ord-1"));
    }

    #[tokio::test]
    async fn test_terminal_record_cannot_regress() {
        let dir = tempdir().unwrap();
        let ledger = FileLedger::open(dir.path().join("ledger.json")).unwrap();
        let id = ledger.create_trade(sample_trade("AAPL")).await.unwrap();

        ledger
            .update_trade_status(id, TradeStatus::Failed, Some(Utc::now()), None)
            .await
            .unwrap();
        ledger
            .update_trade_status(id, TradeStatus::Pending, None, None)
            .await
            .unwrap();

        let record = &ledger.recent_trades(1).await.unwrap()[0];
        assert_eq!(record.status, TradeStatus::Failed);
    }

    #[tokio::test]
    async fn test_unknown_trade_errors() {
        let dir = tempdir().unwrap();
        let ledger = FileLedger::open(dir.path().join("ledger.json")).unwrap();

        let err = ledger
            .update_trade_status(42, TradeStatus::Executed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnknownTrade(42)));
    }

    #[tokio::test]
    async fn test_corrupt_file_reports_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();

        let result = FileLedger::open(&path);
        assert!(matches!(result, Err(LedgerError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_signal_history_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        {
            let ledger = FileLedger::open(&path).unwrap();
            ledger
                .record_signal(SignalEntry::new("sma", "AAPL", SignalAction::Buy, 0.8, false))
                .await
                .unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"strategy\": \"sma\""));
    }
}
