//! REST Brokerage Client
//!
//! Dollar-denominated order placement and account reads against a
//! brokerage REST API. All calls attach the shared session token; a 401
//! surfaces as an authentication failure, which the engine treats as fatal
//! to the running state.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::adapters::broker::session::{map_transport, Credentials, SessionManager};
use crate::domain::signal::SignalAction;
use crate::ports::brokerage::{
    BrokerageClient, BrokerageError, OpenPositions, OrderReceipt, PortfolioView,
};

pub struct RestBrokerage {
    http: Client,
    base_url: String,
    session: SessionManager,
}

impl RestBrokerage {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Credentials,
    ) -> Result<Self, BrokerageError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerageError::Transport(e.to_string()))?;

        Ok(Self {
            session: SessionManager::new(http.clone(), base_url, credentials),
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<T, BrokerageError> {
        let token = self.session.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(BrokerageError::NotAuthenticated);
        }
        if !response.status().is_success() {
            return Err(BrokerageError::Transport(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BrokerageError::Transport(e.to_string()))
    }
}

#[async_trait]
impl BrokerageClient for RestBrokerage {
    async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    async fn portfolio(&self) -> Result<PortfolioView, BrokerageError> {
        let dto: PortfolioDto = self.get_json("/portfolio").await?;
        Ok(PortfolioView {
            total_value: dto.total_value,
            buying_power: dto.buying_power,
            day_change: dto.day_change,
        })
    }

    async fn open_positions(&self) -> Result<OpenPositions, BrokerageError> {
        let dtos: Vec<PositionDto> = self.get_json("/positions").await?;
        let mut quantities = HashMap::with_capacity(dtos.len());
        for position in &dtos {
            quantities.insert(position.symbol.clone(), position.quantity);
        }
        Ok(OpenPositions {
            count: dtos.len(),
            quantities,
        })
    }

    async fn place_order(
        &self,
        symbol: &str,
        action: SignalAction,
        dollar_amount: f64,
    ) -> Result<OrderReceipt, BrokerageError> {
        let token = self.session.access_token().await?;
        let url = format!("{}/orders", self.base_url);
        let request = OrderRequest {
            symbol,
            side: action.as_str(),
            amount: dollar_amount,
            time_in_force: "gfd",
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(BrokerageError::NotAuthenticated);
        }
        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BrokerageError::OrderFailed(detail));
        }

        let body: OrderResponse = response
            .json()
            .await
            .map_err(|e| BrokerageError::OrderFailed(e.to_string()))?;

        tracing::info!(
            symbol,
            side = action.as_str(),
            amount = dollar_amount,
            order_id = %body.id,
            "order accepted by broker"
        );
        Ok(OrderReceipt {
            broker_order_id: body.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PortfolioDto {
    total_value: f64,
    buying_power: f64,
    #[serde(default)]
    day_change: f64,
}

#[derive(Debug, Deserialize)]
struct PositionDto {
    symbol: String,
    quantity: f64,
}

#[derive(Debug, Serialize)]
struct OrderRequest<'a> {
    symbol: &'a str,
    side: &'a str,
    amount: f64,
    time_in_force: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portfolio_dto_defaults_day_change() {
        let json = r#"{"total_value":25000.0,"buying_power":8000.0}"#;
        let dto: PortfolioDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.total_value, 25000.0);
        assert_eq!(dto.day_change, 0.0);
    }

    #[test]
    fn test_order_request_serializes() {
        let request = OrderRequest {
            symbol: "AAPL",
            side: "buy",
            amount: 100.0,
            time_in_force: "gfd",
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""symbol":"AAPL""#));
        assert!(json.contains(r#""side":"buy""#));
        assert!(json.contains(r#""time_in_force":"gfd""#));
    }
}
