//! Text generation provider boundary
//!
//! The dispatcher talks to the outside world only through [`TextProvider`].
//! Provider failures are translated once, at this boundary, into a small
//! closed set of kinds; retry decisions are made on the kind, never on raw
//! error text.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Error Kinds
// ============================================================================

/// Classification of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Rate limit or quota exhausted for this key
    RateLimited,
    /// Provider temporarily unavailable
    Unavailable,
    /// The call did not finish in time
    Timeout,
    /// Key rejected; another key in the pool may still work
    Unauthorized,
    /// Anything else, e.g. a malformed prompt
    Other,
}

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "429",
    "too many requests",
    "quota",
    "rate limit",
    "rate_limit_exceeded",
    "resource_exhausted",
];

const UNAVAILABLE_PATTERNS: &[&str] = &["503", "service unavailable", "unavailable", "overloaded"];

const TIMEOUT_PATTERNS: &[&str] = &["timeout", "timed out", "deadline_exceeded", "504"];

const UNAUTHORIZED_PATTERNS: &[&str] = &[
    "401",
    "403",
    "api_key_invalid",
    "api key not valid",
    "permission_denied",
    "unauthenticated",
    "unauthorized",
];

impl ProviderErrorKind {
    /// Classify a raw provider error message
    ///
    /// Matching is case-insensitive. Patterns are checked in a fixed order
    /// (rate limit, unavailable, timeout, unauthorized) so a message that
    /// mentions several conditions gets a deterministic kind.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let matches_any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        if matches_any(RATE_LIMIT_PATTERNS) {
            Self::RateLimited
        } else if matches_any(UNAVAILABLE_PATTERNS) {
            Self::Unavailable
        } else if matches_any(TIMEOUT_PATTERNS) {
            Self::Timeout
        } else if matches_any(UNAUTHORIZED_PATTERNS) {
            Self::Unauthorized
        } else {
            Self::Other
        }
    }

    /// Classify from an HTTP status, falling back to the message
    pub fn from_status(status: u16, message: &str) -> Self {
        match status {
            429 => Self::RateLimited,
            503 => Self::Unavailable,
            408 | 504 => Self::Timeout,
            401 | 403 => Self::Unauthorized,
            _ => Self::classify(message),
        }
    }

    /// Whether trying a different key may succeed
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Other)
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ============================================================================
// Provider Error
// ============================================================================

/// A failed provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error by classifying its message
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ProviderErrorKind::classify(&message),
            message,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Capability to send one prompt with one key
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Send `prompt` authenticated with `token`, returning the generated text
    async fn send(&self, token: &str, prompt: &str) -> Result<String, ProviderError>;
}
