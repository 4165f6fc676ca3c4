//! Quorum Trader - Main Entry Point
//!
//! Multi-strategy signal aggregation with risk-gated execution.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use quorum_trader::adapters::broker::{Credentials, PaperBroker, RestBrokerage};
use quorum_trader::adapters::cli::{
    AnalyzeCmd, CliApp, Command, HistoryCmd, RunCmd, StatusCmd, TradeCmd, TradeSide,
};
use quorum_trader::adapters::ledger::FileLedger;
use quorum_trader::adapters::market_data::RestMarketData;
use quorum_trader::application::{Engine, EngineConfig};
use quorum_trader::config::{load_config, Config};
use quorum_trader::domain::risk::{RiskConfig, RiskGate};
use quorum_trader::domain::signal::SignalAction;
use quorum_trader::ports::brokerage::BrokerageClient;
use quorum_trader::ports::ledger::Ledger;
use quorum_trader::ports::market_data::{ChainedMarketData, MarketDataSource};
use quorum_trader::strategy::StrategyKind;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (brokerage credentials live there, not in config)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Analyze(cmd) => analyze_command(cmd).await,
        Command::Trade(cmd) => trade_command(cmd).await,
        Command::Status(cmd) => status_command(cmd).await,
        Command::History(cmd) => history_command(cmd).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt().with_env_filter(filter).init();
}

/// Wire every component from config and return a ready engine
fn build_engine(config: &Config, force_paper: bool) -> Result<Engine> {
    let data_timeout = Duration::from_secs(config.market_data.timeout_secs);
    let mut sources: Vec<Arc<dyn MarketDataSource>> = Vec::new();
    for endpoint in &config.market_data.endpoints {
        let source = RestMarketData::new(endpoint, data_timeout)
            .with_context(|| format!("Failed to create market data client for {}", endpoint))?;
        sources.push(Arc::new(source));
    }
    let market_data: Arc<dyn MarketDataSource> = Arc::new(ChainedMarketData::new(sources));

    let broker: Arc<dyn BrokerageClient> = if config.broker.paper || force_paper {
        tracing::warn!("PAPER TRADING MODE - no real orders will be placed");
        Arc::new(PaperBroker::new(config.broker.starting_cash))
    } else {
        let credentials =
            Credentials::from_env().context("Brokerage credentials missing from environment")?;
        Arc::new(
            RestBrokerage::new(
                &config.broker.base_url,
                Duration::from_secs(config.broker.timeout_secs),
                credentials,
            )
            .context("Failed to create brokerage client")?,
        )
    };

    let ledger: Arc<dyn Ledger> =
        Arc::new(FileLedger::open(config.ledger.expanded_path()).context("Failed to open ledger")?);

    let strategies = StrategyKind::from_config(&config.strategy);

    let risk = RiskGate::new(
        RiskConfig {
            max_position_size: config.risk.max_position_size,
            max_daily_loss: config.risk.max_daily_loss,
            max_positions: config.risk.max_positions,
            risk_percentage: config.risk.risk_percentage,
            default_trade_amount: config.risk.default_trade_amount,
        },
        Utc::now().date_naive(),
    );

    let engine_config = EngineConfig {
        symbols: config.engine.symbols.clone(),
        min_confidence: config.engine.min_confidence,
        lookback_days: config.engine.lookback_days,
        cycle_interval: Duration::from_secs(config.engine.cycle_interval_secs),
        symbol_spacing: Duration::from_millis(config.engine.symbol_spacing_ms),
    };

    Ok(Engine::new(
        market_data,
        broker,
        ledger,
        strategies,
        risk,
        engine_config,
    ))
}

fn load_config_with_overrides(path: &std::path::Path, symbols: Option<Vec<String>>) -> Result<Config> {
    let mut config = load_config(path).context("Failed to load configuration")?;
    if let Some(symbols) = symbols {
        config.engine.symbols = symbols;
    }
    Ok(config)
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("starting quorum-trader...");

    let config = load_config_with_overrides(&cmd.config, cmd.symbols)?;
    let engine = build_engine(&config, cmd.paper)?;

    // Ctrl+C requests a stop; in-flight trades still reach a terminal state
    let handle = engine.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
        handle.stop().await;
    });

    engine.run().await?;
    tracing::info!("quorum-trader stopped");
    Ok(())
}

async fn analyze_command(cmd: AnalyzeCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let engine = build_engine(&config, true)?;

    let symbol = cmd.symbol.to_uppercase();
    let report = engine
        .analyze_symbol(&symbol)
        .await
        .with_context(|| format!("Analysis failed for {}", symbol))?;

    println!("--- {} ---", report.symbol);
    let mut ids: Vec<&String> = report.signals.keys().collect();
    ids.sort();
    for id in ids {
        println!("{:>8}: {}", id, report.signals[id]);
    }
    println!("{:>8}: {}", "final", report.decision);
    Ok(())
}

async fn trade_command(cmd: TradeCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let engine = build_engine(&config, false)?;

    let action = match cmd.side {
        TradeSide::Buy => SignalAction::Buy,
        TradeSide::Sell => SignalAction::Sell,
    };

    let symbol = cmd.symbol.to_uppercase();
    match engine.execute_manual_trade(&symbol, action, cmd.amount).await {
        Ok(outcome) => {
            println!(
                "Trade #{} {}: {} {} ${:.2} (order {})",
                outcome.record_id,
                outcome.status,
                action,
                symbol,
                cmd.amount,
                outcome.broker_order_id.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("Trade failed: {}", e)),
    }
}

async fn status_command(cmd: StatusCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let engine = build_engine(&config, false)?;

    let status = engine.status().await;
    println!("Running:        {}", status.is_running);
    println!("Authenticated:  {}", status.is_authenticated);
    println!("Strategies:     {}", status.strategies.join(", "));
    println!("Symbols:        {}", status.symbols.join(", "));

    let risk = engine.risk_metrics().await;
    println!(
        "Daily loss:     ${:.2} of ${:.2} (${:.2} remaining)",
        risk.metrics.daily_loss, risk.metrics.max_daily_loss, risk.metrics.daily_loss_remaining
    );
    println!(
        "Positions:      {} of {} ({} remaining)",
        risk.open_positions, risk.metrics.max_positions, risk.positions_remaining
    );
    Ok(())
}

async fn history_command(cmd: HistoryCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let ledger = FileLedger::open(config.ledger.expanded_path()).context("Failed to open ledger")?;

    let trades = ledger
        .recent_trades(cmd.limit)
        .await
        .context("Failed to read trade history")?;

    if trades.is_empty() {
        println!("No trades recorded yet");
        return Ok(());
    }

    for trade in trades {
        println!(
            "{}  {}  {}",
            trade.created_at.format("%Y-%m-%d %H:%M:%S"),
            trade,
            trade.reason
        );
    }
    Ok(())
}
