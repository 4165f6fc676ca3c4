//! Paper Broker
//!
//! In-process brokerage simulation: tracks cash and dollar-denominated
//! positions, fills every well-formed order instantly. Positions are held
//! at cost; quantities are dollars at entry, which is enough for the
//! engine's position-count and sell-side checks.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::signal::SignalAction;
use crate::ports::brokerage::{
    BrokerageClient, BrokerageError, OpenPositions, OrderReceipt, PortfolioView,
};

#[derive(Debug)]
struct PaperState {
    cash: f64,
    /// symbol -> dollars held at entry
    positions: HashMap<String, f64>,
    next_order: u64,
}

pub struct PaperBroker {
    state: Mutex<PaperState>,
}

impl PaperBroker {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            state: Mutex::new(PaperState {
                cash: starting_cash,
                positions: HashMap::new(),
                next_order: 1,
            }),
        }
    }

    pub async fn cash(&self) -> f64 {
        self.state.lock().await.cash
    }
}

#[async_trait]
impl BrokerageClient for PaperBroker {
    async fn is_authenticated(&self) -> bool {
        true
    }

    async fn portfolio(&self) -> Result<PortfolioView, BrokerageError> {
        let state = self.state.lock().await;
        let held: f64 = state.positions.values().sum();
        Ok(PortfolioView {
            total_value: state.cash + held,
            buying_power: state.cash,
            day_change: 0.0,
        })
    }

    async fn open_positions(&self) -> Result<OpenPositions, BrokerageError> {
        let state = self.state.lock().await;
        let quantities: HashMap<String, f64> = state
            .positions
            .iter()
            .filter(|(_, &v)| v > 0.0)
            .map(|(k, &v)| (k.clone(), v))
            .collect();
        Ok(OpenPositions {
            count: quantities.len(),
            quantities,
        })
    }

    async fn place_order(
        &self,
        symbol: &str,
        action: SignalAction,
        dollar_amount: f64,
    ) -> Result<OrderReceipt, BrokerageError> {
        if dollar_amount <= 0.0 {
            return Err(BrokerageError::OrderFailed(format!(
                "non-positive order amount {}",
                dollar_amount
            )));
        }

        let mut state = self.state.lock().await;
        match action {
            SignalAction::Buy => {
                if state.cash < dollar_amount {
                    return Err(BrokerageError::OrderFailed(format!(
                        "insufficient buying power: need ${:.2}, have ${:.2}",
                        dollar_amount, state.cash
                    )));
                }
                state.cash -= dollar_amount;
                *state.positions.entry(symbol.to_string()).or_insert(0.0) += dollar_amount;
            }
            SignalAction::Sell => {
                let held = state.positions.get(symbol).copied().unwrap_or(0.0);
                if held <= 0.0 {
                    return Err(BrokerageError::OrderFailed(format!(
                        "no position in {} to sell",
                        symbol
                    )));
                }
                let sold = dollar_amount.min(held);
                state.cash += sold;
                let remaining = held - sold;
                if remaining > 0.0 {
                    state.positions.insert(symbol.to_string(), remaining);
                } else {
                    state.positions.remove(symbol);
                }
            }
            SignalAction::Hold => {
                return Err(BrokerageError::OrderFailed(
                    "cannot place a hold order".to_string(),
                ));
            }
        }

        let n = state.next_order;
        state.next_order += 1;

        tracing::info!(
            symbol,
            side = action.as_str(),
            amount = dollar_amount,
            "paper fill"
        );
        Ok(OrderReceipt {
            broker_order_id: format!("paper-{}", n),
        })
    }
}
