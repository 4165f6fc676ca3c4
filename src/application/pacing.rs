//! Pacing Gate
//!
//! Minimum-interval gate between outbound workloads. Both the scheduled
//! cycle and operator commands pass through the same gate, so the combined
//! request rate toward the data and brokerage APIs stays bounded no matter
//! which path is active. The mutex is held across the sleep; callers queue
//! and each departs at least `min_interval` after the previous one.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct PacingGate {
    min_interval: Duration,
    last_departure: Mutex<Option<Instant>>,
}

impl PacingGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_departure: Mutex::new(None),
        }
    }

    /// Wait until at least `min_interval` has passed since the previous
    /// caller departed
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_departure.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spaces_consecutive_callers() {
        let gate = PacingGate::new(Duration::from_millis(30));

        let start = Instant::now();
        gate.wait().await;
        gate.wait().await;
        gate.wait().await;

        // Two enforced gaps after the free first departure
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_zero_interval_is_free() {
        let gate = PacingGate::new(Duration::ZERO);

        let start = Instant::now();
        for _ in 0..100 {
            gate.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_no_wait_after_natural_gap() {
        let gate = PacingGate::new(Duration::from_millis(10));
        gate.wait().await;
        tokio::time::sleep(Duration::from_millis(15)).await;

        let start = Instant::now();
        gate.wait().await;
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
