use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::signal::SignalAction;

#[derive(Debug, Error)]
pub enum BrokerageError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("order placement failed: {0}")]
    OrderFailed(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl BrokerageError {
    /// Session-level failures that invalidate the whole engine run, as
    /// opposed to per-order failures that only fail the current trade
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            BrokerageError::NotAuthenticated | BrokerageError::AuthenticationFailed(_)
        )
    }
}

/// Account-level valuation as reported by the brokerage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioView {
    pub total_value: f64,
    pub buying_power: f64,
    pub day_change: f64,
}

/// Open positions: total count plus per-symbol quantities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenPositions {
    pub count: usize,
    pub quantities: HashMap<String, f64>,
}

impl OpenPositions {
    pub fn quantity(&self, symbol: &str) -> f64 {
        self.quantities.get(symbol).copied().unwrap_or(0.0)
    }
}

/// Broker's acknowledgement of a placed order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub broker_order_id: String,
}

/// Brokerage port: session state, account reads, and order placement.
/// One shared session serves both the scheduled cycle and operator
/// commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerageClient: Send + Sync {
    async fn is_authenticated(&self) -> bool;

    async fn portfolio(&self) -> Result<PortfolioView, BrokerageError>;

    async fn open_positions(&self) -> Result<OpenPositions, BrokerageError>;

    /// Place a dollar-denominated market order
    async fn place_order(
        &self,
        symbol: &str,
        action: SignalAction,
        dollar_amount: f64,
    ) -> Result<OrderReceipt, BrokerageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_classification() {
        assert!(BrokerageError::NotAuthenticated.is_auth_failure());
        assert!(BrokerageError::AuthenticationFailed("bad creds".into()).is_auth_failure());
        assert!(!BrokerageError::OrderFailed("rejected".into()).is_auth_failure());
        assert!(!BrokerageError::Timeout("10s".into()).is_auth_failure());
    }

    #[test]
    fn test_open_positions_quantity_lookup() {
        let mut positions = OpenPositions::default();
        positions.count = 1;
        positions.quantities.insert("AAPL".to_string(), 2.5);

        assert_eq!(positions.quantity("AAPL"), 2.5);
        assert_eq!(positions.quantity("TSLA"), 0.0);
    }

    #[tokio::test]
    async fn test_mock_brokerage_client() {
        let mut mock = MockBrokerageClient::new();
        mock.expect_is_authenticated().returning(|| true);
        mock.expect_portfolio().returning(|| {
            Ok(PortfolioView {
                total_value: 25_000.0,
                buying_power: 10_000.0,
                day_change: 42.0,
            })
        });
        mock.expect_place_order().returning(|symbol, action, amount| {
            assert_eq!(symbol, "AAPL");
            assert_eq!(action, SignalAction::Buy);
            assert_eq!(amount, 100.0);
            Ok(OrderReceipt {
                broker_order_id: "ord-123".to_string(),
            })
        });

        assert!(mock.is_authenticated().await);
        assert_eq!(mock.portfolio().await.unwrap().total_value, 25_000.0);
        let receipt = mock
            .place_order("AAPL", SignalAction::Buy, 100.0)
            .await
            .unwrap();
        assert_eq!(receipt.broker_order_id, "ord-123");
    }
}
