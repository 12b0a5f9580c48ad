//! Retry policy shared by queries and mutations

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration for backend calls.
///
/// `max_attempts` counts every call, the first one included. A value of 1
/// disables retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    /// One retry after a second, the query default of the web client.
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Retry `max_attempts` times in total with no delay in between.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Attempts that will actually be made; zero is treated as one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(16) as i32;
        let factor = f64::from(self.backoff_multiplier).powi(exponent);
        let delay = self.initial_backoff.as_secs_f64() * factor;
        // NaN and negative products (negative multiplier) wait nothing.
        let delay = delay.max(0.0).min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(delay).min(self.max_backoff)
    }
}
