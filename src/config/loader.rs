//! Configuration Loader
//!
//! Loads and validates engine configuration from TOML files. Secrets
//! (brokerage credentials) never live here; they come from the
//! environment.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineSection,
    pub risk: RiskSection,
    pub strategy: StrategySection,
    pub market_data: MarketDataSection,
    pub broker: BrokerSection,
    pub ledger: LedgerSection,
    pub logging: LoggingSection,
}

/// Engine behavior section
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Symbols analyzed on every scheduled cycle
    pub symbols: Vec<String>,
    /// Minimum aggregated confidence before a trade is attempted
    pub min_confidence: f64,
    /// Days of history fetched per symbol
    pub lookback_days: u32,
    /// Seconds between scheduled cycles
    pub cycle_interval_secs: u64,
    /// Minimum milliseconds between per-symbol workloads (request pacing)
    pub symbol_spacing_ms: u64,
}

/// Risk policy section
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSection {
    /// Maximum dollar size of a single trade
    pub max_position_size: f64,
    /// Maximum realized loss per calendar day
    pub max_daily_loss: f64,
    /// Maximum concurrently open positions
    pub max_positions: usize,
    /// Per-trade budget as percentage of portfolio value
    pub risk_percentage: f64,
    /// Trade size fallback when the portfolio value is unavailable
    pub default_trade_amount: f64,
}

/// Strategy selection and parameters
#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    /// Which strategies run each cycle ("sma", "rsi")
    pub active: Vec<String>,
    #[serde(default)]
    pub sma: SmaParams,
    #[serde(default)]
    pub rsi: RsiParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmaParams {
    pub short_window: usize,
    pub long_window: usize,
    /// Minimum relative gap between the means before a signal fires
    pub threshold: f64,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self {
            short_window: 50,
            long_window: 200,
            threshold: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

/// Market data sources, tried in order
#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataSection {
    /// Quote API base URLs; the first reachable source wins
    pub endpoints: Vec<String>,
    /// Per-request timeout
    pub timeout_secs: u64,
}

/// Brokerage connection section
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSection {
    /// Run against the in-process paper broker instead of a real API
    #[serde(default)]
    pub paper: bool,
    /// Simulated cash for the paper broker
    #[serde(default = "default_starting_cash")]
    pub starting_cash: f64,
    /// Brokerage REST API base URL (ignored in paper mode)
    #[serde(default)]
    pub base_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
}

fn default_starting_cash() -> f64 {
    10_000.0
}

/// Ledger storage section
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSection {
    /// Ledger file path; ~ expands to the home directory
    pub path: String,
}

impl LedgerSection {
    pub fn expanded_path(&self) -> String {
        shellexpand::tilde(&self.path).to_string()
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

const KNOWN_STRATEGIES: &[&str] = &["sma", "rsi"];

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.symbols.is_empty() {
            return Err(ConfigError::ValidationError(
                "engine.symbols cannot be empty".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.engine.min_confidence) {
            return Err(ConfigError::ValidationError(format!(
                "min_confidence must be 0-1, got {}",
                self.engine.min_confidence
            )));
        }

        if self.engine.lookback_days == 0 {
            return Err(ConfigError::ValidationError(
                "lookback_days must be > 0".to_string(),
            ));
        }

        // Validate strategy section
        if self.strategy.active.is_empty() {
            return Err(ConfigError::ValidationError(
                "strategy.active cannot be empty".to_string(),
            ));
        }

        for name in &self.strategy.active {
            if !KNOWN_STRATEGIES.contains(&name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "unknown strategy '{}', expected one of {:?}",
                    name, KNOWN_STRATEGIES
                )));
            }
        }

        if self.strategy.sma.short_window == 0
            || self.strategy.sma.short_window >= self.strategy.sma.long_window
        {
            return Err(ConfigError::ValidationError(format!(
                "sma windows must satisfy 0 < short < long, got {}/{}",
                self.strategy.sma.short_window, self.strategy.sma.long_window
            )));
        }

        if self.strategy.sma.threshold <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "sma.threshold must be > 0, got {}",
                self.strategy.sma.threshold
            )));
        }

        if self.strategy.rsi.period == 0 {
            return Err(ConfigError::ValidationError(
                "rsi.period must be > 0".to_string(),
            ));
        }

        if !(0.0 < self.strategy.rsi.oversold
            && self.strategy.rsi.oversold < self.strategy.rsi.overbought
            && self.strategy.rsi.overbought < 100.0)
        {
            return Err(ConfigError::ValidationError(format!(
                "rsi thresholds must satisfy 0 < oversold < overbought < 100, got {}/{}",
                self.strategy.rsi.oversold, self.strategy.rsi.overbought
            )));
        }

        // Validate risk section
        if self.risk.max_position_size <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_position_size must be > 0, got {}",
                self.risk.max_position_size
            )));
        }

        if self.risk.max_daily_loss <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_daily_loss must be > 0, got {}",
                self.risk.max_daily_loss
            )));
        }

        if self.risk.max_positions == 0 {
            return Err(ConfigError::ValidationError(
                "max_positions must be > 0".to_string(),
            ));
        }

        if self.risk.risk_percentage <= 0.0 || self.risk.risk_percentage > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "risk_percentage must be 0-100, got {}",
                self.risk.risk_percentage
            )));
        }

        if self.risk.default_trade_amount <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "default_trade_amount must be > 0, got {}",
                self.risk.default_trade_amount
            )));
        }

        // Validate external endpoints
        if self.market_data.endpoints.is_empty() {
            return Err(ConfigError::ValidationError(
                "market_data.endpoints cannot be empty".to_string(),
            ));
        }

        if !self.broker.paper && self.broker.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "broker.base_url is required when paper mode is off".to_string(),
            ));
        }

        if self.ledger.path.is_empty() {
            return Err(ConfigError::ValidationError(
                "ledger.path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_toml() -> String {
        r#"
            [engine]
            symbols = ["AAPL", "MSFT"]
            min_confidence = 0.6
            lookback_days = 365
            cycle_interval_secs = 300
            symbol_spacing_ms = 1000

            [risk]
            max_position_size = 1000.0
            max_daily_loss = 500.0
            max_positions = 5
            risk_percentage = 2.0
            default_trade_amount = 100.0

            [strategy]
            active = ["sma", "rsi"]

            [strategy.sma]
            short_window = 50
            long_window = 200
            threshold = 0.01

            [strategy.rsi]
            period = 14
            oversold = 30.0
            overbought = 70.0

            [market_data]
            endpoints = ["https://quotes.example.com/api"]
            timeout_secs = 10

            [broker]
            paper = true
            starting_cash = 25000.0
            timeout_secs = 10

            [ledger]
            path = "~/.quorum-trader/ledger.json"

            [logging]
            level = "info"
        "#
        .to_string()
    }

    #[test]
    fn test_valid_config_parses() {
        let config: Config = toml::from_str(&valid_toml()).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.engine.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(config.strategy.sma.long_window, 200);
        assert!(config.broker.paper);
        assert_eq!(config.broker.starting_cash, 25000.0);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let toml = valid_toml().replace(r#"active = ["sma", "rsi"]"#, r#"active = ["macd"]"#);
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_inverted_sma_windows_rejected() {
        let toml = valid_toml().replace("short_window = 50", "short_window = 300");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_live_broker_requires_base_url() {
        let toml = valid_toml().replace("paper = true", "paper = false");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_confidence_rejected() {
        let toml = valid_toml().replace("min_confidence = 0.6", "min_confidence = 1.5");
        let config: Config = toml::from_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        let config: Config = toml::from_str(&valid_toml()).unwrap();
        let expanded = config.ledger.expanded_path();
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("ledger.json"));
    }
}
