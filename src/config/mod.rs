//! Configuration loading and validation

pub mod loader;

pub use loader::{
    load_config, BrokerSection, Config, ConfigError, EngineSection, LedgerSection, LoggingSection,
    MarketDataSection, RiskSection, RsiParams, SmaParams, StrategySection,
};
