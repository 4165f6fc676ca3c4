//! CLI adapter

pub mod commands;

pub use commands::{
    AnalyzeCmd, CliApp, Command, HistoryCmd, RunCmd, StatusCmd, TradeCmd, TradeSide,
};
