//! Bounded retry of transaction attempts on ref conflicts.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Re-runs an attempt while it fails with a retryable error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Drive `attempt` until it succeeds or fails with a non-retryable error.
    ///
    /// `attempt` receives the 1-based attempt number and must rebuild all of
    /// its state from scratch.
    ///
    /// # Errors
    /// Returns the first non-retryable error, or
    /// [`Error::RetriesExhausted`] wrapping the last conflict.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut number = 1;
        loop {
            match attempt(number).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() => {
                    if number >= self.max_attempts {
                        return Err(Error::RetriesExhausted {
                            attempts: number,
                            last: Box::new(err),
                        });
                    }
                    tracing::warn!(
                        attempt = number,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX),
                        "{err}; retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    number += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(1))
    }
}
