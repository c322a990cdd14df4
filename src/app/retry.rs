//! Bounded retry with exponential backoff
//!
//! Every network call in the pipeline goes through [`RetryPolicy::run`]. Each
//! attempt is wrapped in its own timeout; a timed-out attempt counts as a failed
//! attempt rather than hanging. Permanent failures (404, 403, malformed URLs)
//! stop immediately since repeating them cannot help.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{http, limits};
use crate::errors::DownloadError;

/// Retry settings shared by listing, probe and part downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Cap on any single delay
    pub max_delay: Duration,
    /// Growth factor between delays
    pub multiplier: f64,
    /// Timeout applied to each attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(limits::RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_secs(limits::MAX_BACKOFF_SECS),
            multiplier: limits::BACKOFF_MULTIPLIER,
            attempt_timeout: http::DEFAULT_TIMEOUT,
        }
    }
}

/// A retried operation that never succeeded
#[derive(Debug)]
pub struct RetryExhausted {
    /// Attempts actually made
    pub attempts: u32,
    /// Error from the final attempt
    pub last_error: DownloadError,
}

impl RetryPolicy {
    /// Policy without delays, for tests and local sources
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Same policy with a different per-attempt timeout
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_delay)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// The delays that would separate consecutive attempts
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.max_attempts.max(1))
            .map(|_| backoff.next_backoff().unwrap_or(self.max_delay))
            .collect()
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.backoff();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(DownloadError::Timeout {
                    seconds: self.attempt_timeout.as_secs(),
                }),
            };

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", what, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && e.is_transient() => {
                    let delay = backoff.next_backoff().unwrap_or(self.max_delay);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {}ms",
                        what,
                        attempt,
                        max_attempts,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!("{} failed after {} attempts: {}", what, attempt, e);
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                }
            }
        }
    }
}
