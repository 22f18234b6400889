//! Exponential backoff retry policy.
//!
//! The policy is what bounds retry counts: a request descriptor's retry hook
//! may veto an attempt, but it can never extend the schedule past
//! `max_retries`.

use std::time::Duration;

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not counting the first try).
    pub max_retries: u32,
    /// Initial backoff delay.
    pub initial_backoff: Duration,
    /// Maximum backoff delay (caps exponential growth).
    pub max_backoff: Duration,
    /// Multiplier applied to the backoff on each retry.
    pub multiplier: f64,
    /// Deterministic jitter as a fraction of the computed delay
    /// (0.0 = none).
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_fraction: 0.1,
        }
    }
}

/// Stateless policy: computes the delay before a given retry attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay before the `attempt`-th retry (1-based).
    ///
    /// Returns `None` when `attempt` is outside the schedule — the caller
    /// must give up and surface the last error.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.config.max_retries {
            return None;
        }
        let growth = self.config.multiplier.powi(attempt as i32 - 1);
        let base_ms = self.config.initial_backoff.as_secs_f64() * 1_000.0 * growth;
        let cap_ms = self.config.max_backoff.as_secs_f64() * 1_000.0;
        let capped_ms = base_ms.min(cap_ms);

        // Half-width deterministic jitter keeps schedules reproducible.
        let total_ms = capped_ms * (1.0 + self.config.jitter_fraction * 0.5);
        Some(Duration::from_secs_f64(total_ms / 1_000.0))
    }
}
