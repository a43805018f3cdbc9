//! Randomized settle delays.
//!
//! Every state-mutating action (navigation, scroll, expander click) is
//! followed by a bounded random pause so asynchronously-inserted content can
//! attach before the next DOM query, and so the traffic pattern stays
//! human-paced.

use rand::Rng;
use std::time::Duration;

/// A closed delay interval sampled uniformly per wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self { min, max }
    }

    pub fn from_secs_f64(min: f64, max: f64) -> Self {
        Self::new(
            Duration::from_secs_f64(min.max(0.0)),
            Duration::from_secs_f64(max.max(0.0)),
        )
    }

    /// No-op delays, used by snapshot extraction and tests.
    pub fn zero() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Per-cycle settle after a scroll or click.
    pub fn settle_default() -> Self {
        Self::from_secs_f64(2.0, 5.0)
    }

    /// Longer wait after navigation, before the first probe.
    pub fn initial_default() -> Self {
        Self::from_secs_f64(5.0, 8.0)
    }

    /// Politeness pause between URLs in a batch.
    pub fn pause_default() -> Self {
        Self::from_secs_f64(10.0, 20.0)
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            self.min
        } else {
            rand::thread_rng().gen_range(self.min..=self.max)
        }
    }

    /// Sleep for one sampled delay.
    pub async fn settle(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::trace!("settling for {:.2}s", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}
