//! Credential-rotating dispatcher
//!
//! `Dispatcher` sends a prompt through the injected [`TextProvider`],
//! starting at whichever key the shared rotation cursor points to and
//! failing over to the next key whenever the failure is retryable. Each
//! call tries at most one full pass over the pool.

use crate::services::key_pool::{KeyPool, PoolStats};
use crate::services::provider::{ProviderError, ProviderErrorKind, TextProvider};
use crate::utils::{estimate_tokens, with_timeout, TimeoutError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Failure of a whole dispatch call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// A non-retryable provider error; remaining keys were not tried
    #[error("{0}")]
    Provider(ProviderError),

    /// Every attempt failed with a retryable error
    #[error("All {pool_size} API keys failed. Last error: {}", .last_error.message)]
    PoolExhausted {
        pool_size: usize,
        last_error: ProviderError,
    },
}

impl DispatchError {
    /// Kind of the underlying provider error
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            DispatchError::Provider(err) => err.kind,
            DispatchError::PoolExhausted { last_error, .. } => last_error.kind,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, DispatchError::PoolExhausted { .. })
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Round-robin, fail-over dispatcher over a [`KeyPool`]
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<KeyPool>,
    provider: Arc<dyn TextProvider>,
    attempt_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher without a per-attempt deadline
    pub fn new(pool: Arc<KeyPool>, provider: Arc<dyn TextProvider>) -> Self {
        Self {
            pool,
            provider,
            attempt_timeout: None,
        }
    }

    /// Bound each attempt; an expired attempt counts as a retryable timeout
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// The underlying pool
    pub fn pool(&self) -> &KeyPool {
        &self.pool
    }

    /// Read-only usage statistics
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Send `prompt`, failing over across keys on retryable errors
    pub async fn dispatch(&self, prompt: &str) -> Result<String, DispatchError> {
        let pool_size = self.pool.len();
        let max_attempts = pool_size;
        let prompt_tokens = estimate_tokens(prompt);
        let mut attempts = 0;
        let mut last_error: Option<ProviderError> = None;

        tracing::debug!(
            prompt_tokens = prompt_tokens,
            pool_size = pool_size,
            "Dispatching prompt"
        );

        while attempts < max_attempts {
            let (index, credential) = self.pool.select_next();
            let label = format!("#{}/{}", index + 1, pool_size);
            let preview = credential.preview();

            tracing::info!(
                credential = %label,
                preview = %preview,
                attempt = attempts + 1,
                "Using API key"
            );

            match self.attempt(credential.token(), prompt).await {
                Ok(text) => {
                    let uses = self.pool.record_use(index);
                    let response_tokens = estimate_tokens(&text);
                    tracing::debug!(
                        response_tokens = response_tokens,
                        total_tokens = prompt_tokens + response_tokens,
                        "Estimated token usage"
                    );
                    tracing::info!(
                        credential = %label,
                        preview = %preview,
                        uses = uses,
                        "API key succeeded"
                    );
                    return Ok(text);
                }
                Err(err) => {
                    let failures = self.pool.record_failure(index);
                    let retryable = err.is_retryable();
                    let will_retry = retryable && attempts + 1 < max_attempts;

                    tracing::warn!(
                        credential = %label,
                        preview = %preview,
                        error = %err,
                        kind = %err.kind,
                        failures = failures,
                        retryable = retryable,
                        will_retry = will_retry,
                        "API key failed"
                    );

                    if !retryable {
                        self.log_summary();
                        return Err(DispatchError::Provider(err));
                    }

                    last_error = Some(err);
                    if !will_retry {
                        break;
                    }
                    attempts += 1;
                }
            }
        }

        self.log_summary();

        Err(DispatchError::PoolExhausted {
            pool_size,
            last_error: last_error
                .unwrap_or_else(|| ProviderError::new(ProviderErrorKind::Other, "Unknown")),
        })
    }

    async fn attempt(&self, token: &str, prompt: &str) -> Result<String, ProviderError> {
        let Some(timeout) = self.attempt_timeout else {
            return self.provider.send(token, prompt).await;
        };

        with_timeout(timeout, self.provider.send(token, prompt))
            .await
            .map_err(|err| match err {
                TimeoutError::Timeout(elapsed) => {
                    ProviderError::timeout(format!("Attempt timeout after {:?}", elapsed))
                }
                TimeoutError::Inner(inner) => inner,
            })
    }

    fn log_summary(&self) {
        let stats = self.pool.stats();
        tracing::error!(
            pool_size = stats.total_credentials,
            total_uses = stats.total_uses(),
            total_failures = stats.total_failures(),
            "Dispatch failed"
        );
        for (index, entry) in stats.per_credential.iter().enumerate() {
            tracing::warn!(
                credential = %format!("#{}", index + 1),
                preview = %entry.preview,
                uses = entry.uses,
                failures = entry.failures,
                "API key summary"
            );
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
