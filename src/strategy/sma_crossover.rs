//! Moving-Average Crossover
//!
//! Compares short-window and long-window trailing means of the most recent
//! closes. The signal fires on the relative gap between the two means, with
//! confidence scaled from the size of the gap.

use crate::domain::signal::{Signal, SignalAction};
use crate::ports::market_data::PricePoint;
use crate::strategy::{trailing_mean, StrategyError};

#[derive(Debug, Clone)]
pub struct SmaCrossover {
    pub short_window: usize,
    pub long_window: usize,
    /// Minimum relative gap between the means before a signal fires
    pub threshold: f64,
}

impl Default for SmaCrossover {
    fn default() -> Self {
        Self {
            short_window: 50,
            long_window: 200,
            threshold: 0.01,
        }
    }
}

impl SmaCrossover {
    pub fn new(short_window: usize, long_window: usize, threshold: f64) -> Self {
        Self {
            short_window,
            long_window,
            threshold,
        }
    }

    pub fn min_history(&self) -> usize {
        self.long_window
    }

    pub fn evaluate(&self, symbol: &str, series: &[PricePoint]) -> Result<Signal, StrategyError> {
        if series.iter().any(|p| !p.close.is_finite()) {
            return Err(StrategyError::NonFinitePrice(symbol.to_string()));
        }

        if series.len() < self.long_window {
            return Ok(Signal::hold(format!(
                "insufficient price history: need {} points, got {}",
                self.long_window,
                series.len()
            )));
        }

        let closes: Vec<f64> = series.iter().map(|p| p.close).collect();
        let short_ma = trailing_mean(&closes, self.short_window);
        let long_ma = trailing_mean(&closes, self.long_window);
        let current_price = closes[closes.len() - 1];

        let pct_diff = (short_ma - long_ma) / long_ma;
        let confidence = (pct_diff.abs() * 10.0).min(1.0);

        let signal = if pct_diff > self.threshold {
            Signal::new(
                SignalAction::Buy,
                confidence,
                format!(
                    "short MA ({:.2}) above long MA ({:.2}) by {:.2}%",
                    short_ma,
                    long_ma,
                    pct_diff * 100.0
                ),
            )
        } else if pct_diff < -self.threshold {
            Signal::new(
                SignalAction::Sell,
                confidence,
                format!(
                    "short MA ({:.2}) below long MA ({:.2}) by {:.2}%",
                    short_ma,
                    long_ma,
                    pct_diff.abs() * 100.0
                ),
            )
        } else {
            Signal::new(
                SignalAction::Hold,
                0.5,
                format!(
                    "moving averages within threshold: short {:.2}, long {:.2}",
                    short_ma, long_ma
                ),
            )
        };

        Ok(signal
            .with_evidence("short_ma", short_ma)
            .with_evidence("long_ma", long_ma)
            .with_evidence("pct_diff", pct_diff)
            .with_evidence("current_price", current_price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::series_from;

    fn small_sma() -> SmaCrossover {
        SmaCrossover::new(3, 6, 0.01)
    }

    #[test]
    fn test_rising_series_buys() {
        let sma = small_sma();
        let closes: Vec<f64> = (1..=20).map(|i| 100.0 + i as f64).collect();
        let signal = sma.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert!(signal.confidence > 0.0);
        assert!(signal.evidence.contains_key("short_ma"));
        assert!(signal.evidence["short_ma"] > signal.evidence["long_ma"]);
    }

    #[test]
    fn test_falling_series_sells() {
        let sma = small_sma();
        let closes: Vec<f64> = (1..=20).map(|i| 200.0 - 2.0 * i as f64).collect();
        let signal = sma.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Sell);
        assert!(signal.confidence > 0.0);
    }

    #[test]
    fn test_flat_series_holds_at_half_confidence() {
        let sma = small_sma();
        let closes = vec![100.0; 20];
        let signal = sma.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.confidence, 0.5);
    }

    #[test]
    fn test_short_series_soft_fails() {
        let sma = small_sma();
        let closes = vec![100.0, 101.0, 102.0];
        let signal = sma.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.confidence, 0.0);
        assert!(signal.reason.contains("insufficient price history"));
    }

    #[test]
    fn test_confidence_saturates_at_one() {
        let sma = small_sma();
        // Explosive ramp: relative gap far beyond 10%
        let closes: Vec<f64> = (1..=20).map(|i| (i * i) as f64).collect();
        let signal = sma.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.confidence, 1.0);
    }

    #[test]
    fn test_non_finite_price_is_a_fault() {
        let sma = small_sma();
        let mut closes = vec![100.0; 20];
        closes[10] = f64::NAN;
        let result = sma.evaluate("AAPL", &series_from(&closes));

        assert!(matches!(result, Err(StrategyError::NonFinitePrice(_))));
    }
}
