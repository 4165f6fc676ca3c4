use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::signal::SignalAction;

/// Lifecycle of a trade record. `Pending` is the only non-terminal state;
/// a record created `Rejected` never transitions at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Executed,
    Rejected,
    Failed,
}

impl TradeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TradeStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Executed => "executed",
            TradeStatus::Rejected => "rejected",
            TradeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempted or completed trade, as persisted by the ledger.
///
/// After creation only `status`, `executed_at` and `broker_order_id` ever
/// change, and only through a single ledger update per transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: u64,
    pub symbol: String,
    pub action: SignalAction,
    pub quantity: f64,
    pub price: f64,
    pub total_amount: f64,
    pub strategy: String,
    pub confidence: f64,
    pub reason: String,
    pub broker_order_id: Option<String>,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}

/// Fields supplied when a trade record is created; the ledger assigns the
/// id and the creation timestamp.
#[derive(Debug, Clone)]
pub struct NewTrade {
    pub symbol: String,
    pub action: SignalAction,
    pub quantity: f64,
    pub price: f64,
    pub total_amount: f64,
    pub strategy: String,
    pub confidence: f64,
    pub reason: String,
    pub status: TradeStatus,
}

impl NewTrade {
    /// A trade about to be sent to the broker
    pub fn pending(
        symbol: &str,
        action: SignalAction,
        quantity: f64,
        price: f64,
        total_amount: f64,
        strategy: &str,
        confidence: f64,
        reason: &str,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            action,
            quantity,
            price,
            total_amount,
            strategy: strategy.to_string(),
            confidence,
            reason: reason.to_string(),
            status: TradeStatus::Pending,
        }
    }

    /// A trade refused by the risk gate, recorded terminally for audit
    pub fn rejected(
        symbol: &str,
        action: SignalAction,
        total_amount: f64,
        strategy: &str,
        confidence: f64,
        reason: &str,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            action,
            quantity: 0.0,
            price: 0.0,
            total_amount,
            strategy: strategy.to_string(),
            confidence,
            reason: reason.to_string(),
            status: TradeStatus::Rejected,
        }
    }
}

impl fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} ${:.2} [{}]",
            self.id, self.action, self.symbol, self.total_amount, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!TradeStatus::Pending.is_terminal());
        assert!(TradeStatus::Executed.is_terminal());
        assert!(TradeStatus::Rejected.is_terminal());
        assert!(TradeStatus::Failed.is_terminal());
    }

    #[test]
    fn test_pending_constructor() {
        let trade = NewTrade::pending(
            "AAPL",
            SignalAction::Buy,
            0.55,
            182.0,
            100.0,
            "combined",
            0.8,
            "Buy consensus",
        );
        assert_eq!(trade.status, TradeStatus::Pending);
        assert_eq!(trade.symbol, "AAPL");
        assert_eq!(trade.total_amount, 100.0);
    }

    #[test]
    fn test_rejected_constructor_is_terminal() {
        let trade = NewTrade::rejected(
            "TSLA",
            SignalAction::Buy,
            5000.0,
            "combined",
            0.9,
            "position size $5000.00 exceeds maximum $1000.00",
        );
        assert_eq!(trade.status, TradeStatus::Rejected);
        assert!(trade.status.is_terminal());
        assert_eq!(trade.quantity, 0.0);
    }

    #[test]
    fn test_record_display() {
        let record = TradeRecord {
            id: 7,
            symbol: "MSFT".to_string(),
            action: SignalAction::Sell,
            quantity: 1.2,
            price: 410.0,
            total_amount: 492.0,
            strategy: "manual".to_string(),
            confidence: 1.0,
            reason: "manual trade".to_string(),
            broker_order_id: Some("ord-1".to_string()),
            status: TradeStatus::Executed,
            created_at: Utc::now(),
            executed_at: Some(Utc::now()),
        };

        let text = record.to_string();
        assert!(text.contains("#7"));
        assert!(text.contains("sell MSFT"));
        assert!(text.contains("[executed]"));
    }
}
