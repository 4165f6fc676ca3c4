//! RSI Oscillator
//!
//! Classic 0-100 relative strength index over a trailing window: the ratio
//! of mean gain to mean loss across the last `period` price changes. Buys
//! into oversold readings, sells into overbought ones, with confidence
//! scaled linearly toward the extremes.

use crate::domain::signal::{Signal, SignalAction};
use crate::ports::market_data::PricePoint;
use crate::strategy::StrategyError;

#[derive(Debug, Clone)]
pub struct RsiOscillator {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiOscillator {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl RsiOscillator {
    pub fn new(period: usize, oversold: f64, overbought: f64) -> Self {
        Self {
            period,
            oversold,
            overbought,
        }
    }

    pub fn min_history(&self) -> usize {
        self.period + 1
    }

    /// Index over the trailing window. Returns the neutral 50.0 when the
    /// series is too short; a window with zero mean loss reads as 100.
    pub fn index(&self, closes: &[f64]) -> f64 {
        if closes.len() < self.period + 1 {
            return 50.0;
        }

        let window = &closes[closes.len() - (self.period + 1)..];
        let mut gain_sum = 0.0;
        let mut loss_sum = 0.0;
        for pair in window.windows(2) {
            let delta = pair[1] - pair[0];
            if delta > 0.0 {
                gain_sum += delta;
            } else {
                loss_sum += -delta;
            }
        }

        let avg_gain = gain_sum / self.period as f64;
        let avg_loss = loss_sum / self.period as f64;

        if avg_loss == 0.0 {
            return 100.0;
        }

        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }

    pub fn evaluate(&self, symbol: &str, series: &[PricePoint]) -> Result<Signal, StrategyError> {
        if series.iter().any(|p| !p.close.is_finite()) {
            return Err(StrategyError::NonFinitePrice(symbol.to_string()));
        }

        if series.len() < self.period + 1 {
            return Ok(Signal::hold(format!(
                "insufficient price history: need {} points, got {}",
                self.period + 1,
                series.len()
            )));
        }

        let closes: Vec<f64> = series.iter().map(|p| p.close).collect();
        let rsi = self.index(&closes);
        let current_price = closes[closes.len() - 1];

        let signal = if rsi < self.oversold {
            let confidence = ((self.oversold - rsi) / self.oversold).min(1.0);
            Signal::new(
                SignalAction::Buy,
                confidence,
                format!("RSI ({:.2}) oversold (< {:.0})", rsi, self.oversold),
            )
        } else if rsi > self.overbought {
            let confidence = ((rsi - self.overbought) / (100.0 - self.overbought)).min(1.0);
            Signal::new(
                SignalAction::Sell,
                confidence,
                format!("RSI ({:.2}) overbought (> {:.0})", rsi, self.overbought),
            )
        } else {
            Signal::new(
                SignalAction::Hold,
                0.5,
                format!(
                    "RSI ({:.2}) in neutral zone ({:.0}-{:.0})",
                    rsi, self.oversold, self.overbought
                ),
            )
        };

        Ok(signal
            .with_evidence("rsi", rsi)
            .with_evidence("current_price", current_price)
            .with_evidence("oversold_threshold", self.oversold)
            .with_evidence("overbought_threshold", self.overbought))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::tests::series_from;
    use approx::assert_relative_eq;

    fn rsi5() -> RsiOscillator {
        RsiOscillator::new(5, 30.0, 70.0)
    }

    #[test]
    fn test_short_series_soft_fails() {
        let rsi = rsi5();
        let signal = rsi.evaluate("AAPL", &series_from(&[100.0; 5])).unwrap();

        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.confidence, 0.0);
        assert!(signal.reason.contains("insufficient price history"));
    }

    #[test]
    fn test_index_neutral_when_window_short() {
        let rsi = rsi5();
        assert_eq!(rsi.index(&[100.0, 101.0]), 50.0);
    }

    #[test]
    fn test_all_gains_drive_index_to_hundred() {
        let rsi = rsi5();
        let closes: Vec<f64> = (1..=10).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi.index(&closes), 100.0);
    }

    #[test]
    fn test_all_losses_drive_index_to_zero() {
        let rsi = rsi5();
        let closes: Vec<f64> = (1..=10).map(|i| 200.0 - i as f64).collect();
        assert_relative_eq!(rsi.index(&closes), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_oversold_buys_with_scaled_confidence() {
        let rsi = rsi5();
        // Steady decline: RSI 0, confidence (30 - 0) / 30 = 1.0
        let closes: Vec<f64> = (1..=10).map(|i| 200.0 - 3.0 * i as f64).collect();
        let signal = rsi.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Buy);
        assert_relative_eq!(signal.confidence, 1.0, epsilon = 1e-12);
        assert_relative_eq!(signal.evidence["rsi"], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_overbought_sells() {
        let rsi = rsi5();
        let closes: Vec<f64> = (1..=10).map(|i| 100.0 + 3.0 * i as f64).collect();
        let signal = rsi.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Sell);
        assert_relative_eq!(signal.confidence, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mixed_series_holds() {
        let rsi = rsi5();
        // Gains and losses balance over the window (+2, -1, +1, -2, 0),
        // so mean gain == mean loss and RSI sits at 50
        let closes = vec![100.0, 100.0, 100.0, 102.0, 101.0, 102.0, 100.0, 100.0];
        let signal = rsi.evaluate("AAPL", &series_from(&closes)).unwrap();

        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.confidence, 0.5);
        assert_relative_eq!(signal.evidence["rsi"], 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_non_finite_price_is_a_fault() {
        let rsi = rsi5();
        let closes = vec![100.0, f64::INFINITY, 100.0, 100.0, 100.0, 100.0];
        let result = rsi.evaluate("AAPL", &series_from(&closes));

        assert!(matches!(result, Err(StrategyError::NonFinitePrice(_))));
    }
}
