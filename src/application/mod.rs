//! Application Layer - the execution engine and its pacing

pub mod engine;
pub mod pacing;

pub use engine::{
    AnalysisReport, Engine, EngineConfig, EngineError, EngineStatus, RiskReport, TradeOutcome,
};
pub use pacing::PacingGate;
