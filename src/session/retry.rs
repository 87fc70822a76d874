use crate::core::errors::IgError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Exponential backoff for requests that failed with a retryable error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
        }
    }

    /// A single attempt, no retries
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before each retry: one entry per attempt after the first
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let multiplier = self.multiplier;
        std::iter::successors(Some(self.initial_delay), move |d| {
            Some(d.saturating_mul(multiplier))
        })
        .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up. The last error is returned as-is.
    pub async fn run<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T, IgError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IgError>>,
    {
        let mut delays = self.delays();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => match delays.next() {
                    Some(delay) => {
                        warn!(
                            operation = operation_name,
                            attempt,
                            max_attempts = self.max_attempts,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "{}, retrying",
                            e
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// Fixed-delay polling for deal confirmations that are not available yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}
