//! CLI Command Definitions
//!
//! Argument parsing for the quorum-trader binary. Handlers live in main.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Quorum Trader - multi-strategy signal aggregation and risk-gated execution
#[derive(Parser, Debug)]
#[command(
    name = "quorum-trader",
    version = env!("CARGO_PKG_VERSION"),
    about = "Multi-strategy signal aggregation and risk-gated trade execution",
    long_about = "Quorum Trader runs several technical strategies per symbol, reduces \
                  their signals to one decision by confidence-weighted voting, and only \
                  trades what the risk gate approves. Every decision lands in the ledger."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the scheduled trading loop
    Run(RunCmd),

    /// Analyze a symbol without trading
    Analyze(AnalyzeCmd),

    /// Execute a manual trade through the risk gate
    Trade(TradeCmd),

    /// Show engine status and risk metrics
    Status(StatusCmd),

    /// Show recent trades from the ledger
    History(HistoryCmd),
}

/// Start the trading loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Force paper trading regardless of configuration
    #[arg(short, long)]
    pub paper: bool,

    /// Override the symbols to trade
    #[arg(long, value_name = "SYMBOL", num_args = 1..)]
    pub symbols: Option<Vec<String>>,
}

/// Analyze one symbol
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// Stock symbol (e.g. AAPL)
    #[arg(value_name = "SYMBOL")]
    pub symbol: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Side of a manual trade
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Execute a manual trade
#[derive(Parser, Debug)]
pub struct TradeCmd {
    /// Stock symbol (e.g. AAPL)
    #[arg(value_name = "SYMBOL")]
    pub symbol: String,

    /// buy or sell
    #[arg(value_name = "SIDE")]
    pub side: TradeSide,

    /// Dollar amount to trade
    #[arg(value_name = "AMOUNT")]
    pub amount: f64,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Show engine status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,
}

/// Show trade history
#[derive(Parser, Debug)]
pub struct HistoryCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Maximum number of trades to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}
