//! Timeout utilities for provider calls
//!
//! The dispatcher never imposes a deadline on its own; these helpers let a
//! deployment opt into a per-attempt limit that surfaces as an ordinary,
//! retryable failure.

use std::time::Duration;

/// Timeout configuration for outbound generation calls
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Whole-request timeout applied by the HTTP client (default: 120s)
    pub http_timeout: Duration,

    /// Deadline for a single dispatch attempt; `None` disables it
    pub attempt_timeout: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(120),
            attempt_timeout: None,
        }
    }
}

impl TimeoutConfig {
    /// Build from second counts, where zero disables the attempt deadline
    pub fn from_secs(http_secs: u64, attempt_secs: u64) -> Self {
        Self {
            http_timeout: Duration::from_secs(http_secs),
            attempt_timeout: (attempt_secs > 0).then(|| Duration::from_secs(attempt_secs)),
        }
    }
}

/// Apply timeout to an async operation
pub async fn with_timeout<T, E>(
    timeout: Duration,
    future: impl std::future::Future<Output = Result<T, E>>,
) -> Result<T, TimeoutError<E>> {
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TimeoutError::Inner(err)),
        Err(_) => Err(TimeoutError::Timeout(timeout)),
    }
}

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Inner(E),
}
