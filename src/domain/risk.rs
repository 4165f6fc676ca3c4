//! Risk Gate
//!
//! Stateful risk policy consulted before every order: a daily realized-loss
//! ceiling that resets on calendar rollover, per-trade size and open-position
//! ceilings, and a portfolio-percentage budget. Also owns position sizing.
//!
//! Callers pass the current calendar date into every stateful operation so
//! the rollover logic stays deterministic under test; the engine wraps one
//! `RiskGate` in a single mutex and performs the reset check, the limit
//! checks, and any accumulation inside the same critical section.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::signal::SignalAction;

/// Smallest order the sizer will ever propose, in dollars
pub const MIN_TRADE_AMOUNT: f64 = 10.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskRejection {
    #[error("daily loss limit reached: ${0:.2} >= ${1:.2}")]
    DailyLossLimit(f64, f64),

    #[error("position size ${0:.2} exceeds maximum ${1:.2}")]
    PositionSizeExceeded(f64, f64),

    #[error("open position limit reached: {0} >= {1}")]
    PositionLimitReached(usize, usize),

    #[error("amount ${0:.2} exceeds {1:.1}% portfolio risk budget (${2:.2})")]
    RiskBudgetExceeded(f64, f64, f64),
}

/// Static risk limits, loaded from configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum dollar size of a single trade
    pub max_position_size: f64,
    /// Maximum realized loss per calendar day before trading halts
    pub max_daily_loss: f64,
    /// Maximum number of concurrently open positions
    pub max_positions: usize,
    /// Per-trade budget as a percentage of total portfolio value
    pub risk_percentage: f64,
    /// Fallback trade size when the portfolio value is unavailable
    pub default_trade_amount: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_size: 1000.0,
            max_daily_loss: 500.0,
            max_positions: 5,
            risk_percentage: 2.0,
            default_trade_amount: 100.0,
        }
    }
}

/// Point-in-time view of the gate for the control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub daily_loss: f64,
    pub max_daily_loss: f64,
    pub daily_loss_remaining: f64,
    pub max_positions: usize,
    pub max_position_size: f64,
    pub risk_percentage: f64,
}

/// Mutable daily state. Process-scoped only: a restart starts a fresh
/// counter.
#[derive(Debug, Clone)]
struct RiskState {
    daily_loss: f64,
    last_reset: NaiveDate,
}

/// Risk policy object: approves or rejects proposed trades and sizes
/// positions from signal confidence.
#[derive(Debug, Clone)]
pub struct RiskGate {
    config: RiskConfig,
    state: RiskState,
}

impl RiskGate {
    pub fn new(config: RiskConfig, today: NaiveDate) -> Self {
        Self {
            config,
            state: RiskState {
                daily_loss: 0.0,
                last_reset: today,
            },
        }
    }

    /// Approve or reject a proposed trade. Checks run in a fixed order and
    /// the first failure wins:
    ///
    /// 1. daily-loss ceiling (after the calendar reset check)
    /// 2. per-trade size ceiling
    /// 3. open-position ceiling (buys only)
    /// 4. portfolio-percentage budget, skipped when the portfolio value is
    ///    unknown or zero (degraded data is not a risk violation)
    pub fn approve(
        &mut self,
        symbol: &str,
        action: SignalAction,
        amount: f64,
        open_positions: usize,
        portfolio_value: Option<f64>,
        today: NaiveDate,
    ) -> Result<(), RiskRejection> {
        self.reset_if_new_day(today);

        if self.state.daily_loss >= self.config.max_daily_loss {
            return Err(RiskRejection::DailyLossLimit(
                self.state.daily_loss,
                self.config.max_daily_loss,
            ));
        }

        if amount > self.config.max_position_size {
            return Err(RiskRejection::PositionSizeExceeded(
                amount,
                self.config.max_position_size,
            ));
        }

        if action == SignalAction::Buy && open_positions >= self.config.max_positions {
            return Err(RiskRejection::PositionLimitReached(
                open_positions,
                self.config.max_positions,
            ));
        }

        match portfolio_value {
            Some(total) if total > 0.0 => {
                let budget = total * (self.config.risk_percentage / 100.0);
                if amount > budget {
                    return Err(RiskRejection::RiskBudgetExceeded(
                        amount,
                        self.config.risk_percentage,
                        budget,
                    ));
                }
            }
            _ => {
                tracing::debug!(symbol, "portfolio value unavailable, skipping budget check");
            }
        }

        Ok(())
    }

    /// Size a position from signal confidence: the portfolio-percentage
    /// budget scaled by `0.5 + 0.5 * confidence`, clamped to
    /// `[MIN_TRADE_AMOUNT, max_position_size]`. Falls back to the
    /// configured default amount when the portfolio value is unavailable.
    pub fn size_position(&self, confidence: f64, portfolio_value: Option<f64>) -> f64 {
        let total = match portfolio_value {
            Some(v) if v > 0.0 => v,
            _ => return self.config.default_trade_amount,
        };

        let base = total * (self.config.risk_percentage / 100.0);
        let scaled = base * (0.5 + confidence * 0.5);

        scaled
            .min(self.config.max_position_size)
            .max(MIN_TRADE_AMOUNT)
    }

    /// Accumulate a realized loss. Only called once a trade outcome has
    /// confirmed the loss, never speculatively.
    pub fn record_realized_loss(&mut self, amount: f64, today: NaiveDate) {
        self.reset_if_new_day(today);
        self.state.daily_loss += amount;
        tracing::info!(
            daily_loss = self.state.daily_loss,
            "daily realized loss updated"
        );
    }

    pub fn daily_loss(&self) -> f64 {
        self.state.daily_loss
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn metrics(&mut self, today: NaiveDate) -> RiskMetrics {
        self.reset_if_new_day(today);
        RiskMetrics {
            daily_loss: self.state.daily_loss,
            max_daily_loss: self.config.max_daily_loss,
            daily_loss_remaining: (self.config.max_daily_loss - self.state.daily_loss).max(0.0),
            max_positions: self.config.max_positions,
            max_position_size: self.config.max_position_size,
            risk_percentage: self.config.risk_percentage,
        }
    }

    /// Zero the daily counter exactly once when the calendar date advances
    fn reset_if_new_day(&mut self, today: NaiveDate) {
        if today > self.state.last_reset {
            tracing::info!(%today, "calendar rollover, resetting daily loss counter");
            self.state.daily_loss = 0.0;
            self.state.last_reset = today;
        }
    }
}
