//! Strategy Layer - signal generation over historical price series
//!
//! The engine runs a closed set of strategy kinds, selected by
//! configuration. Each kind evaluates one symbol's price series into a
//! `Signal`; a series shorter than the strategy's lookback produces a
//! zero-confidence hold rather than an error, so one thin symbol never
//! disturbs the rest of a cycle.

pub mod rsi;
pub mod sma_crossover;

use thiserror::Error;

use crate::config::StrategySection;
use crate::domain::signal::Signal;
use crate::ports::market_data::PricePoint;

pub use rsi::RsiOscillator;
pub use sma_crossover::SmaCrossover;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("non-finite price in series for {0}")]
    NonFinitePrice(String),
}

/// The closed set of strategies the engine knows how to run
#[derive(Debug, Clone)]
pub enum StrategyKind {
    SmaCrossover(SmaCrossover),
    Rsi(RsiOscillator),
}

impl StrategyKind {
    /// Stable identifier used as the key of the per-pass result set and in
    /// the signal history
    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::SmaCrossover(_) => "sma",
            StrategyKind::Rsi(_) => "rsi",
        }
    }

    /// Number of price points required for a full-confidence evaluation
    pub fn min_history(&self) -> usize {
        match self {
            StrategyKind::SmaCrossover(s) => s.min_history(),
            StrategyKind::Rsi(s) => s.min_history(),
        }
    }

    pub fn evaluate(&self, symbol: &str, series: &[PricePoint]) -> Result<Signal, StrategyError> {
        match self {
            StrategyKind::SmaCrossover(s) => s.evaluate(symbol, series),
            StrategyKind::Rsi(s) => s.evaluate(symbol, series),
        }
    }

    /// Build the active strategy set from configuration. Unknown names are
    /// rejected at config validation time; anything left here is silently
    /// skipped.
    pub fn from_config(section: &StrategySection) -> Vec<StrategyKind> {
        section
            .active
            .iter()
            .filter_map(|name| match name.as_str() {
                "sma" => Some(StrategyKind::SmaCrossover(SmaCrossover::new(
                    section.sma.short_window,
                    section.sma.long_window,
                    section.sma.threshold,
                ))),
                "rsi" => Some(StrategyKind::Rsi(RsiOscillator::new(
                    section.rsi.period,
                    section.rsi.oversold,
                    section.rsi.overbought,
                ))),
                other => {
                    tracing::warn!(strategy = other, "unknown strategy name, skipping");
                    None
                }
            })
            .collect()
    }
}

/// Mean of the last `window` values
pub(crate) fn trailing_mean(values: &[f64], window: usize) -> f64 {
    let tail = &values[values.len() - window..];
    tail.iter().sum::<f64>() / window as f64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    /// Build a daily price series ending now from a list of closes
    pub(crate) fn series_from(closes: &[f64]) -> Vec<PricePoint> {
        let start = Utc::now() - Duration::days(closes.len() as i64);
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                timestamp: start + Duration::days(i as i64),
                close,
            })
            .collect()
    }

    #[test]
    fn test_trailing_mean() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(trailing_mean(&values, 2), 4.5);
        assert_eq!(trailing_mean(&values, 5), 3.0);
    }

    #[test]
    fn test_kind_ids_and_lookbacks() {
        let sma = StrategyKind::SmaCrossover(SmaCrossover::new(10, 30, 0.01));
        let rsi = StrategyKind::Rsi(RsiOscillator::new(14, 30.0, 70.0));

        assert_eq!(sma.id(), "sma");
        assert_eq!(sma.min_history(), 30);
        assert_eq!(rsi.id(), "rsi");
        assert_eq!(rsi.min_history(), 15);
    }
}
