//! Retry policy for remote E-utilities calls
//!
//! Every remote call runs under a [`RetryConfig`]. Transient failures are
//! re-attempted up to `max_attempts` times in total; once the budget is spent
//! the last failure is wrapped in [`PubMedError::UpstreamUnavailable`].
//! Non-transient failures are returned immediately.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::{debug, warn};

use crate::error::{PubMedError, Result};

/// Classifies errors as transient (worth another attempt) or permanent
pub trait RetryableError {
    /// Whether the failed operation may succeed if attempted again
    fn is_retryable(&self) -> bool;

    /// Short human readable reason, used in log events
    fn retry_reason(&self) -> &str;
}

/// How often and how fast a failed remote call is re-attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryConfig {
    /// Three attempts, re-attempted immediately
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }

    /// A single attempt with no retries
    pub fn no_retry() -> Self {
        Self::new().with_max_attempts(1)
    }

    /// Set the total number of attempts (values below 1 are treated as 1)
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the pause between attempts
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `operation` under `config`, re-attempting transient failures.
///
/// Returns the first success, the first non-transient error, or
/// `UpstreamUnavailable` wrapping the last transient error once all attempts
/// are used.
pub async fn with_retry<T, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let attempts = AtomicU32::new(0);

    let strategy = FixedInterval::new(config.delay).take((max_attempts - 1) as usize);

    let action = || {
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(attempt, max_attempts, "Starting {}", operation_name);
        operation()
    };

    let condition = |err: &PubMedError| {
        let retry = err.is_retryable();
        if retry {
            warn!(
                attempt = attempts.load(Ordering::Relaxed),
                max_attempts,
                reason = err.retry_reason(),
                error = %err,
                "{} failed",
                operation_name
            );
        }
        retry
    };

    match RetryIf::spawn(strategy, action, condition).await {
        Ok(value) => Ok(value),
        Err(err) if err.is_retryable() => Err(PubMedError::UpstreamUnavailable {
            attempts: attempts.load(Ordering::Relaxed),
            source: Box::new(err),
        }),
        Err(err) => Err(err),
    }
}
