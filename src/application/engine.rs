//! Execution Engine
//!
//! Top-level driver shared by the scheduled loop and operator commands.
//! Each cycle pulls history per symbol, runs the configured strategies,
//! aggregates their signals, and routes any actionable decision through
//! the risk gate before the broker ever sees it. Every attempt lands in
//! the ledger, approved or not.
//!
//! Failure policy: one symbol's problems never abort the cycle. Market
//! data failures skip the symbol, strategy faults drop one signal, order
//! failures fail one record. Only an invalid brokerage session is fatal,
//! flipping the engine to not-running. A stop request is honored between
//! symbols, never mid-trade, so records always reach a terminal status.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::application::pacing::PacingGate;
use crate::domain::aggregator::DecisionAggregator;
use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::risk::{RiskGate, RiskMetrics, RiskRejection};
use crate::domain::signal::{Signal, SignalAction};
use crate::domain::trade::{NewTrade, TradeStatus};
use crate::ports::brokerage::{BrokerageClient, BrokerageError, OpenPositions, PortfolioView};
use crate::ports::ledger::{Ledger, LedgerError, SignalEntry};
use crate::ports::market_data::{MarketDataError, MarketDataSource, PricePoint};
use crate::strategy::StrategyKind;

/// Strategy label recorded on aggregated (scheduled) trades
const COMBINED_LABEL: &str = "combined";
/// Strategy label recorded on operator-initiated trades
const MANUAL_LABEL: &str = "manual";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("market data unavailable for {symbol}: {source}")]
    DataUnavailable {
        symbol: String,
        #[source]
        source: MarketDataError,
    },

    #[error("brokerage session invalid: {0}")]
    AuthenticationFailure(String),

    #[error("trade refused by risk policy: {0}")]
    RiskRejected(#[from] RiskRejection),

    #[error("order execution failed for {symbol}: {source}")]
    ExecutionFailure {
        symbol: String,
        #[source]
        source: BrokerageError,
    },

    #[error("no open position in {0} to sell")]
    NoPositionToSell(String),

    #[error("invalid manual trade: {0}")]
    InvalidManualTrade(String),

    #[error("ledger write failed: {0}")]
    PersistenceFailure(#[from] LedgerError),
}

/// Engine behavior knobs, derived from the `[engine]` config section
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub symbols: Vec<String>,
    pub min_confidence: f64,
    pub lookback_days: u32,
    pub cycle_interval: Duration,
    pub symbol_spacing: Duration,
}

/// Result of one executed (or failed) trade attempt
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub record_id: u64,
    pub status: TradeStatus,
    pub broker_order_id: Option<String>,
}

/// Per-strategy signals plus the aggregated decision for one symbol
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub symbol: String,
    pub signals: HashMap<String, Signal>,
    pub decision: Signal,
}

/// Status snapshot for the control surface
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub is_running: bool,
    pub is_authenticated: bool,
    pub strategies: Vec<String>,
    pub symbols: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Risk gate state combined with live position usage
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    #[serde(flatten)]
    pub metrics: RiskMetrics,
    pub open_positions: usize,
    pub positions_remaining: usize,
}

/// The orchestrator: one instance is shared (via clones) by the scheduled
/// loop and the operator command handlers.
pub struct Engine {
    market_data: Arc<dyn MarketDataSource>,
    broker: Arc<dyn BrokerageClient>,
    ledger: Arc<dyn Ledger>,
    strategies: Arc<Vec<StrategyKind>>,
    aggregator: DecisionAggregator,
    risk: Arc<Mutex<RiskGate>>,
    pacing: Arc<PacingGate>,
    config: Arc<EngineConfig>,
    is_running: Arc<RwLock<bool>>,
}

impl Engine {
    pub fn new(
        market_data: Arc<dyn MarketDataSource>,
        broker: Arc<dyn BrokerageClient>,
        ledger: Arc<dyn Ledger>,
        strategies: Vec<StrategyKind>,
        risk: RiskGate,
        config: EngineConfig,
    ) -> Self {
        let pacing = PacingGate::new(config.symbol_spacing);
        Self {
            market_data,
            broker,
            ledger,
            strategies: Arc::new(strategies),
            aggregator: DecisionAggregator::new(),
            risk: Arc::new(Mutex::new(risk)),
            pacing: Arc::new(pacing),
            config: Arc::new(config),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Mark the engine running. Fails when no brokerage session can be
    /// established, since nothing useful can happen without one.
    pub async fn start(&self) -> Result<(), EngineError> {
        if !self.broker.is_authenticated().await {
            return Err(EngineError::AuthenticationFailure(
                "brokerage session could not be established".to_string(),
            ));
        }
        *self.is_running.write().await = true;
        tracing::info!("engine started");
        Ok(())
    }

    /// Request a stop. An in-flight trade still runs to a terminal record
    /// status; the cycle yields at the next symbol boundary.
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        tracing::info!("stop signal sent to engine");
    }

    /// Scheduled loop: run a cycle, sleep, repeat until stopped
    pub async fn run(&self) -> Result<(), EngineError> {
        self.start().await?;

        while *self.is_running.read().await {
            self.run_cycle().await?;

            if !*self.is_running.read().await {
                break;
            }
            tokio::time::sleep(self.config.cycle_interval).await;
        }

        tracing::info!("engine stopped");
        Ok(())
    }

    /// One pass over the configured symbols. Per-symbol failures degrade
    /// locally; only an authentication failure aborts and stops the
    /// engine. Exactly one portfolio snapshot is appended per cycle.
    pub async fn run_cycle(&self) -> Result<(), EngineError> {
        tracing::info!(symbols = ?self.config.symbols, "running trading cycle");

        // Only honor stop requests if the engine was actually started;
        // ad-hoc cycles (tests, one-shot CLI runs) process every symbol.
        let honor_stop = *self.is_running.read().await;

        for symbol in self.config.symbols.iter().map(String::as_str) {
            if honor_stop && !*self.is_running.read().await {
                tracing::info!("stop requested, ending cycle early");
                break;
            }

            self.pacing.wait().await;

            match self.process_symbol(symbol).await {
                Ok(()) => {}
                Err(EngineError::AuthenticationFailure(detail)) => {
                    tracing::error!(symbol, "brokerage session invalid, stopping engine");
                    *self.is_running.write().await = false;
                    return Err(EngineError::AuthenticationFailure(detail));
                }
                Err(EngineError::RiskRejected(rejection)) => {
                    tracing::info!(symbol, %rejection, "trade refused by risk gate");
                }
                Err(EngineError::NoPositionToSell(_)) => {
                    tracing::info!(symbol, "sell signal with no open position, skipping");
                }
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "symbol skipped");
                }
            }
        }

        self.append_cycle_snapshot().await;
        Ok(())
    }

    /// Analyze one symbol without trading: every strategy's signal plus
    /// the aggregated decision
    pub async fn analyze_symbol(&self, symbol: &str) -> Result<AnalysisReport, EngineError> {
        let series = self.fetch_history(symbol).await?;
        if series.is_empty() {
            return Err(EngineError::DataUnavailable {
                symbol: symbol.to_string(),
                source: MarketDataError::NoData(symbol.to_string()),
            });
        }

        let signals = self.evaluate_strategies(symbol, &series, false).await;
        let decision = self.aggregator.aggregate(&signals);
        Ok(AnalysisReport {
            symbol: symbol.to_string(),
            signals,
            decision,
        })
    }

    /// Operator-initiated trade: skips the strategy pipeline but follows
    /// the exact same risk-gate -> broker -> ledger path as the cycle
    pub async fn execute_manual_trade(
        &self,
        symbol: &str,
        action: SignalAction,
        amount: f64,
    ) -> Result<TradeOutcome, EngineError> {
        if action == SignalAction::Hold {
            return Err(EngineError::InvalidManualTrade(
                "manual trades must be buy or sell".to_string(),
            ));
        }
        if amount <= 0.0 {
            return Err(EngineError::InvalidManualTrade(format!(
                "amount must be positive, got {}",
                amount
            )));
        }

        let (portfolio, positions) = self.account_state(symbol).await?;
        let decision = Signal::new(action, 1.0, "manual trade");
        self.execute_decision(
            symbol,
            &decision,
            Some(amount),
            MANUAL_LABEL,
            portfolio,
            &positions,
        )
        .await
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            is_running: *self.is_running.read().await,
            is_authenticated: self.broker.is_authenticated().await,
            strategies: self.strategies.iter().map(|s| s.id().to_string()).collect(),
            symbols: self.config.symbols.clone(),
            timestamp: Utc::now(),
        }
    }

    pub async fn risk_metrics(&self) -> RiskReport {
        let metrics = self.risk_gate().metrics(Utc::now().date_naive());

        let open_positions = match self.broker.open_positions().await {
            Ok(positions) => positions.count,
            Err(e) => {
                tracing::warn!(error = %e, "positions unavailable for risk report");
                0
            }
        };

        RiskReport {
            open_positions,
            positions_remaining: metrics.max_positions.saturating_sub(open_positions),
            metrics,
        }
    }

    /// Feed a confirmed realized loss into the daily-loss accounting
    pub fn record_realized_loss(&self, amount: f64) {
        self.risk_gate()
            .record_realized_loss(amount, Utc::now().date_naive());
    }

    fn risk_gate(&self) -> MutexGuard<'_, RiskGate> {
        self.risk.lock().expect("risk gate lock poisoned")
    }

    async fn fetch_history(&self, symbol: &str) -> Result<Vec<PricePoint>, EngineError> {
        self.market_data
            .price_history(symbol, self.config.lookback_days)
            .await
            .map_err(|source| EngineError::DataUnavailable {
                symbol: symbol.to_string(),
                source,
            })
    }

    /// Steps 1-7 of the cycle for one symbol
    async fn process_symbol(&self, symbol: &str) -> Result<(), EngineError> {
        let series = self.fetch_history(symbol).await?;
        if series.is_empty() {
            tracing::warn!(symbol, "empty price series, skipping");
            return Ok(());
        }

        let signals = self.evaluate_strategies(symbol, &series, true).await;
        if signals.is_empty() {
            tracing::warn!(symbol, "no signals generated, skipping");
            return Ok(());
        }

        let decision = self.aggregator.aggregate(&signals);
        tracing::info!(symbol, decision = %decision, "aggregated decision");

        if decision.confidence < self.config.min_confidence {
            tracing::info!(
                symbol,
                confidence = decision.confidence,
                minimum = self.config.min_confidence,
                "confidence below threshold, no trade"
            );
            return Ok(());
        }

        if decision.action == SignalAction::Hold {
            tracing::info!(symbol, "hold decision, no trade");
            return Ok(());
        }

        let (portfolio, positions) = self.account_state(symbol).await?;
        let outcome = self
            .execute_decision(symbol, &decision, None, COMBINED_LABEL, portfolio, &positions)
            .await?;

        tracing::info!(
            symbol,
            record = outcome.record_id,
            status = %outcome.status,
            "trade attempt finished"
        );
        Ok(())
    }

    /// Run every configured strategy over the series. A faulting strategy
    /// is excluded from the result set; the rest of the pass continues.
    async fn evaluate_strategies(
        &self,
        symbol: &str,
        series: &[PricePoint],
        record: bool,
    ) -> HashMap<String, Signal> {
        let mut signals = HashMap::with_capacity(self.strategies.len());

        for strategy in self.strategies.iter() {
            match strategy.evaluate(symbol, series) {
                Ok(signal) => {
                    tracing::info!(symbol, strategy = strategy.id(), signal = %signal, "strategy signal");
                    if record {
                        let entry = SignalEntry::new(
                            strategy.id(),
                            symbol,
                            signal.action,
                            signal.confidence,
                            false,
                        );
                        if let Err(e) = self.ledger.record_signal(entry).await {
                            tracing::warn!(symbol, error = %e, "failed to record signal history");
                        }
                    }
                    signals.insert(strategy.id().to_string(), signal);
                }
                Err(e) => {
                    tracing::error!(
                        symbol,
                        strategy = strategy.id(),
                        error = %e,
                        "strategy fault, excluding signal"
                    );
                }
            }
        }

        signals
    }

    /// Portfolio value and open positions for risk checks. Auth failures
    /// are fatal; an unreadable portfolio only degrades the budget check.
    async fn account_state(
        &self,
        symbol: &str,
    ) -> Result<(Option<PortfolioView>, OpenPositions), EngineError> {
        let portfolio = match self.broker.portfolio().await {
            Ok(view) => Some(view),
            Err(e) if e.is_auth_failure() => {
                return Err(EngineError::AuthenticationFailure(e.to_string()));
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "portfolio unavailable, budget check degraded");
                None
            }
        };

        let positions = match self.broker.open_positions().await {
            Ok(positions) => positions,
            Err(e) if e.is_auth_failure() => {
                return Err(EngineError::AuthenticationFailure(e.to_string()));
            }
            Err(e) => {
                return Err(EngineError::ExecutionFailure {
                    symbol: symbol.to_string(),
                    source: e,
                });
            }
        };

        Ok((portfolio, positions))
    }

    /// Shared tail of both trading paths: size, risk-gate, record, place,
    /// finalize. The trade record always reaches a terminal status before
    /// this returns.
    async fn execute_decision(
        &self,
        symbol: &str,
        decision: &Signal,
        amount_override: Option<f64>,
        strategy_label: &str,
        portfolio: Option<PortfolioView>,
        positions: &OpenPositions,
    ) -> Result<TradeOutcome, EngineError> {
        if decision.action == SignalAction::Sell && positions.quantity(symbol) <= 0.0 {
            return Err(EngineError::NoPositionToSell(symbol.to_string()));
        }

        let portfolio_value = portfolio.as_ref().map(|p| p.total_value);
        let amount = amount_override.unwrap_or_else(|| {
            self.risk_gate()
                .size_position(decision.confidence, portfolio_value)
        });

        // One critical section covers the reset check and every limit check
        let approval = self.risk_gate().approve(
            symbol,
            decision.action,
            amount,
            positions.count,
            portfolio_value,
            Utc::now().date_naive(),
        );

        if let Err(rejection) = approval {
            tracing::warn!(symbol, %rejection, "risk gate rejected trade");
            self.ledger
                .create_trade(NewTrade::rejected(
                    symbol,
                    decision.action,
                    amount,
                    strategy_label,
                    decision.confidence,
                    &format!("risk rejected: {}", rejection),
                ))
                .await?;
            return Err(EngineError::RiskRejected(rejection));
        }

        // Reference price for the record; a missing quote degrades the
        // record, not the trade
        let price = match self.market_data.current_price(symbol).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "no current quote, recording zero price");
                0.0
            }
        };
        let quantity = if price > 0.0 { amount / price } else { 0.0 };

        let record_id = self
            .ledger
            .create_trade(NewTrade::pending(
                symbol,
                decision.action,
                quantity,
                price,
                amount,
                strategy_label,
                decision.confidence,
                &decision.reason,
            ))
            .await?;

        match self.broker.place_order(symbol, decision.action, amount).await {
            Ok(receipt) => {
                self.ledger
                    .update_trade_status(
                        record_id,
                        TradeStatus::Executed,
                        Some(Utc::now()),
                        Some(receipt.broker_order_id.clone()),
                    )
                    .await?;

                let entry = SignalEntry::new(
                    strategy_label,
                    symbol,
                    decision.action,
                    decision.confidence,
                    true,
                );
                if let Err(e) = self.ledger.record_signal(entry).await {
                    tracing::warn!(symbol, error = %e, "failed to record executed signal");
                }

                tracing::info!(
                    symbol,
                    record = record_id,
                    order = %receipt.broker_order_id,
                    amount,
                    "order executed"
                );
                Ok(TradeOutcome {
                    record_id,
                    status: TradeStatus::Executed,
                    broker_order_id: Some(receipt.broker_order_id),
                })
            }
            Err(e) => {
                // The record reaches a terminal status no matter what;
                // a second persistence failure is logged, not masked
                if let Err(ledger_err) = self
                    .ledger
                    .update_trade_status(record_id, TradeStatus::Failed, Some(Utc::now()), None)
                    .await
                {
                    tracing::error!(
                        symbol,
                        record = record_id,
                        error = %ledger_err,
                        "failed to mark trade record failed"
                    );
                }

                if e.is_auth_failure() {
                    Err(EngineError::AuthenticationFailure(e.to_string()))
                } else {
                    tracing::error!(symbol, error = %e, "order placement failed");
                    Err(EngineError::ExecutionFailure {
                        symbol: symbol.to_string(),
                        source: e,
                    })
                }
            }
        }
    }

    /// One portfolio snapshot per cycle, best effort
    async fn append_cycle_snapshot(&self) {
        let portfolio = match self.broker.portfolio().await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(error = %e, "portfolio unavailable, skipping cycle snapshot");
                return;
            }
        };

        let positions_count = match self.broker.open_positions().await {
            Ok(positions) => positions.count,
            Err(_) => 0,
        };

        let snapshot = PortfolioSnapshot::new(
            portfolio.total_value,
            portfolio.buying_power,
            positions_count,
            portfolio.day_change,
        );

        if let Err(e) = self.ledger.append_snapshot(snapshot).await {
            tracing::error!(error = %e, "failed to append portfolio snapshot");
        }
    }
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            market_data: Arc::clone(&self.market_data),
            broker: Arc::clone(&self.broker),
            ledger: Arc::clone(&self.ledger),
            strategies: Arc::clone(&self.strategies),
            aggregator: self.aggregator,
            risk: Arc::clone(&self.risk),
            pacing: Arc::clone(&self.pacing),
            config: Arc::clone(&self.config),
            is_running: Arc::clone(&self.is_running),
        }
    }
}
