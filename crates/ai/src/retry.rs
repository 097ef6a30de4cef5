//! Retry policy for transient backend failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Jitter factor (0.0-1.0) applied around the computed delay.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// A policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn exponential(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            jitter: 0.1,
        }
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts <= self.max_retries
    }

    /// Delay before retry number `retry` (1-indexed): `base * 2^(retry-1)`,
    /// capped at `max_delay`, with deterministic jitter.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let exp = 2_f64.powi(retry.saturating_sub(1).min(30) as i32);
        let delay_ms = (base_ms * exp).min(max_ms);

        // Deterministic pseudo-jitter keyed on the retry number.
        let jitter_range = delay_ms * self.jitter.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            let pseudo_random = ((retry as f64 * 17.0) % 100.0) / 100.0;
            jitter_range * (pseudo_random - 0.5) * 2.0
        } else {
            0.0
        };

        Duration::from_millis((delay_ms + jitter).clamp(0.0, max_ms) as u64)
    }
}
