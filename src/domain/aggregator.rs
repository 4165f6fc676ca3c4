//! Decision Aggregator
//!
//! Reduces the per-strategy signal set for one symbol into a single
//! actionable signal via confidence-weighted voting. Buy confidences and
//! sell confidences are summed separately; a side wins only when it both
//! outweighs the other side and clears an absolute score floor, so a lone
//! half-hearted strategy cannot move the engine. Ties always resolve to
//! hold.

use std::collections::HashMap;

use crate::domain::signal::{Signal, SignalAction};

/// Minimum winning score: a side must sum above this to act at all
const SCORE_FLOOR: f64 = 0.5;

/// Confidence-weighted voting over a set of strategy signals
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionAggregator;

impl DecisionAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Reduce a strategy-id -> signal map to one final signal.
    ///
    /// The returned reason concatenates every contributing strategy's
    /// reason tagged with its identifier, in identifier order, so the
    /// decision stays traceable in the ledger.
    pub fn aggregate(&self, signals: &HashMap<String, Signal>) -> Signal {
        if signals.is_empty() {
            return Signal::hold("no signals");
        }

        let mut buy_score = 0.0;
        let mut sell_score = 0.0;
        let mut total_confidence = 0.0;

        // Iterate in identifier order so the concatenated reason (and
        // therefore the persisted record) is deterministic.
        let mut ids: Vec<&String> = signals.keys().collect();
        ids.sort();

        let mut reasons = Vec::with_capacity(signals.len());
        for id in &ids {
            let signal = &signals[*id];
            match signal.action {
                SignalAction::Buy => buy_score += signal.confidence,
                SignalAction::Sell => sell_score += signal.confidence,
                SignalAction::Hold => {}
            }
            total_confidence += signal.confidence;
            reasons.push(format!("{}: {}", id, signal.reason));
        }

        let count = signals.len() as f64;
        let joined = reasons.join("; ");

        if buy_score > sell_score && buy_score > SCORE_FLOOR {
            Signal::new(
                SignalAction::Buy,
                buy_score / count,
                format!("Buy consensus: {}", joined),
            )
        } else if sell_score > buy_score && sell_score > SCORE_FLOOR {
            Signal::new(
                SignalAction::Sell,
                sell_score / count,
                format!("Sell consensus: {}", joined),
            )
        } else {
            Signal::new(
                SignalAction::Hold,
                total_confidence / count,
                format!("Hold consensus: {}", joined),
            )
        }
    }
}
