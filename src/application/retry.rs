//! Bounded retry with exponential backoff for contended allocations

use crate::domain::repository::StoreError;
use crate::domain::sequence::AllocationError;
use crate::infrastructure::log_messages;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};

/// Errors that know whether repeating the failed operation may succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for AllocationError {
    fn is_retryable(&self) -> bool {
        AllocationError::is_retryable(self)
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        StoreError::is_retryable(self)
    }
}

impl Retryable for crate::Error {
    fn is_retryable(&self) -> bool {
        crate::Error::is_retryable(self)
    }
}

/// Retry configuration for contended allocations
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
    /// Exponential backoff factor
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay_ms =
            (self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent)) as u64;

        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retry budget is spent
    ///
    /// Each attempt must be a complete unit of work; a retried attempt never
    /// reuses anything produced by a failed one.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "{}",
                        log_messages::allocation::CONTENDED
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    if err.is_retryable() {
                        error!(
                            attempts = attempt + 1,
                            error = %err,
                            "{}",
                            log_messages::allocation::RETRIES_EXHAUSTED
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
