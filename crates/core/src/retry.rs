//! Bounded retry with a fixed delay between attempts.
//!
//! One policy object is shared by every remote fetch that retries: the
//! tracker catalogue download and the per-pass torrent list.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_delay")]
    pub delay_ms: u64,
}

fn default_attempts() -> u32 {
    5
}

fn default_delay() -> u64 {
    1000 // 1 second
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay(),
        }
    }
}

/// Retry policy: bounded attempts, fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. `attempts` is clamped to at least 1.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// A policy that tries once and never waits.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Upper bound on wall time for a run whose attempts each take at most
    /// `per_attempt`. Saturates instead of overflowing.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        let attempts = per_attempt
            .checked_mul(self.attempts)
            .unwrap_or(Duration::MAX);
        let waits = self
            .delay
            .checked_mul(self.attempts - 1)
            .unwrap_or(Duration::MAX);
        attempts.saturating_add(waits)
    }

    /// Run `op` until it succeeds or the attempts are exhausted.
    ///
    /// Returns the last error when every attempt fails.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "attempt failed, retrying in {:?}",
                        self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        operation,
                        attempts = self.attempts,
                        error = %e,
                        "giving up after final attempt"
                    );
                    return Err(e);
                }
            }
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_millis(config.delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}
