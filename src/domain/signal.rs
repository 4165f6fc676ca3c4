use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "buy",
            SignalAction::Sell => "sell",
            SignalAction::Hold => "hold",
        }
    }
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The output of one strategy evaluation: an action, a confidence in
/// [0.0, 1.0], a human-readable reason, and the numeric evidence that
/// went into the decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub confidence: f64,
    pub reason: String,
    pub evidence: HashMap<String, f64>,
}

impl Signal {
    /// Creates a new signal with empty evidence
    pub fn new(action: SignalAction, confidence: f64, reason: impl Into<String>) -> Self {
        Self {
            action,
            confidence,
            reason: reason.into(),
            evidence: HashMap::new(),
        }
    }

    /// Zero-confidence hold, used when a strategy cannot evaluate
    pub fn hold(reason: impl Into<String>) -> Self {
        Self::new(SignalAction::Hold, 0.0, reason)
    }

    /// Builder method to attach one evidence value
    pub fn with_evidence(mut self, key: &str, value: f64) -> Self {
        self.evidence.insert(key.to_string(), value);
        self
    }

    /// Validates the signal meets basic criteria
    pub fn validate(&self) -> Result<(), String> {
        if self.confidence.is_nan() || self.confidence < 0.0 || self.confidence > 1.0 {
            return Err(format!("Invalid confidence value: {}", self.confidence));
        }

        if self.evidence.values().any(|v| v.is_nan()) {
            return Err("Evidence values cannot be NaN".to_string());
        }

        Ok(())
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (confidence {:.2}): {}",
            self.action, self.confidence, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_creation() {
        let signal = Signal::new(SignalAction::Buy, 0.8, "short MA above long MA");
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.confidence, 0.8);
        assert!(signal.evidence.is_empty());
    }

    #[test]
    fn test_hold_has_zero_confidence() {
        let signal = Signal::hold("insufficient data");
        assert_eq!(signal.action, SignalAction::Hold);
        assert_eq!(signal.confidence, 0.0);
    }

    #[test]
    fn test_evidence_builder() {
        let signal = Signal::new(SignalAction::Sell, 0.6, "overbought")
            .with_evidence("rsi", 78.2)
            .with_evidence("current_price", 182.4);

        assert_eq!(signal.evidence.len(), 2);
        assert_eq!(signal.evidence.get("rsi"), Some(&78.2));
    }

    #[test]
    fn test_signal_validation() {
        let valid = Signal::new(SignalAction::Buy, 0.5, "ok");
        assert!(valid.validate().is_ok());

        let mut too_confident = Signal::new(SignalAction::Buy, 0.5, "ok");
        too_confident.confidence = 1.1;
        assert!(too_confident.validate().is_err());

        let nan_evidence = Signal::new(SignalAction::Hold, 0.0, "ok").with_evidence("x", f64::NAN);
        assert!(nan_evidence.validate().is_err());
    }

    #[test]
    fn test_action_display() {
        assert_eq!(SignalAction::Buy.to_string(), "buy");
        assert_eq!(SignalAction::Sell.to_string(), "sell");
        assert_eq!(SignalAction::Hold.to_string(), "hold");
    }
}
