//! Brokerage Session Management
//!
//! Owns the access token for the brokerage REST API. Credentials come from
//! the environment, never from config files. Token refresh is serialized
//! behind its own mutex so concurrent callers cannot re-establish the
//! session twice; this lock is independent of (and much shorter-lived
//! than) the risk-gate lock.

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::ports::brokerage::BrokerageError;

/// Environment variable holding the brokerage account name
pub const USERNAME_VAR: &str = "BROKER_USERNAME";
/// Environment variable holding the brokerage password
pub const PASSWORD_VAR: &str = "BROKER_PASSWORD";

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read credentials from the environment (.env is loaded at startup)
    pub fn from_env() -> Result<Self, BrokerageError> {
        let username = std::env::var(USERNAME_VAR).map_err(|_| {
            BrokerageError::AuthenticationFailed(format!("{} not set", USERNAME_VAR))
        })?;
        let password = std::env::var(PASSWORD_VAR).map_err(|_| {
            BrokerageError::AuthenticationFailed(format!("{} not set", PASSWORD_VAR))
        })?;
        Ok(Self { username, password })
    }
}

#[derive(Debug, Clone)]
struct SessionToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl SessionToken {
    fn is_valid(&self) -> bool {
        self.expires_at > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Serialized login/refresh for one shared brokerage session
pub struct SessionManager {
    http: Client,
    base_url: String,
    credentials: Credentials,
    token: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    pub fn new(http: Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
        }
    }

    /// Current access token, logging in or refreshing if needed. The mutex
    /// is held across the login call so only one caller refreshes.
    pub async fn access_token(&self) -> Result<String, BrokerageError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_valid() {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.login().await?;
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    /// True when a session can be established or already exists
    pub async fn is_authenticated(&self) -> bool {
        self.access_token().await.is_ok()
    }

    /// Drop the session; the next call logs in again
    pub async fn logout(&self) {
        let mut guard = self.token.lock().await;
        *guard = None;
        tracing::info!("brokerage session dropped");
    }

    async fn login(&self) -> Result<SessionToken, BrokerageError> {
        let url = format!("{}/session", self.base_url);
        let request = LoginRequest {
            username: &self.credentials.username,
            password: &self.credentials.password,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        if !response.status().is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BrokerageError::AuthenticationFailed(detail));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| BrokerageError::AuthenticationFailed(e.to_string()))?;

        tracing::info!("brokerage session established");
        Ok(SessionToken {
            access_token: body.access_token,
            expires_at: Utc::now() + Duration::seconds(body.expires_in_secs),
        })
    }
}

pub(crate) fn map_transport(e: reqwest::Error) -> BrokerageError {
    if e.is_timeout() {
        BrokerageError::Timeout(e.to_string())
    } else {
        BrokerageError::Transport(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    expires_in_secs: i64,
}
