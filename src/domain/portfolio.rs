use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable portfolio fact appended to the ledger once per trading cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_value: f64,
    pub buying_power: f64,
    pub positions_count: usize,
    pub day_change: f64,
    pub day_change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn new(
        total_value: f64,
        buying_power: f64,
        positions_count: usize,
        day_change: f64,
    ) -> Self {
        let day_change_percent = if total_value > 0.0 {
            day_change / total_value * 100.0
        } else {
            0.0
        };

        Self {
            total_value,
            buying_power,
            positions_count,
            day_change,
            day_change_percent,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_day_change_percent_derived() {
        let snapshot = PortfolioSnapshot::new(20_000.0, 5_000.0, 3, 150.0);
        assert_relative_eq!(snapshot.day_change_percent, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_value_portfolio_has_zero_percent() {
        let snapshot = PortfolioSnapshot::new(0.0, 0.0, 0, -25.0);
        assert_eq!(snapshot.day_change_percent, 0.0);
    }
}
