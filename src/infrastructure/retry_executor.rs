//! Retry executor for remote table calls
//!
//! Wraps a single store call. Quota rejections are retried with capped
//! exponential backoff; every other failure is returned on the spot.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::errors::StoreError;
use crate::infrastructure::config::RetryConfig;

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    RateLimited,
    NonRecoverable,
}

impl ErrorClassification {
    pub const fn of(error: &StoreError) -> Self {
        if error.is_rate_limited() {
            Self::RateLimited
        } else {
            Self::NonRecoverable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Total attempts, including the first call
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub const fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
            max_attempts: config.max_attempts,
        }
    }

    /// `min(initial_backoff * 2^attempt, max_backoff)`, attempt being 0-based
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |backoff| backoff.min(self.max_backoff))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `call` until it succeeds, fails with a non-quota error, or the
    /// attempt ceiling is reached. The last error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded on attempt {}", operation, attempt + 1);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let classification = ErrorClassification::of(&error);
                    if classification == ErrorClassification::NonRecoverable {
                        return Err(error);
                    }
                    if attempt + 1 >= max_attempts {
                        warn!("{} exhausted {} attempts: {}", operation, max_attempts, error);
                        return Err(error);
                    }

                    let backoff = self.policy.backoff_for(attempt);
                    warn!(
                        "{} rate limited (attempt {}/{}), retrying in {:?}: {}",
                        operation,
                        attempt + 1,
                        max_attempts,
                        backoff,
                        error
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
