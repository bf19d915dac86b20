//! Credential record and its lifetime counters
//!
//! A `Credential` wraps one API key. The raw token is only reachable through
//! [`Credential::token`] (for the outbound call) and [`Credential::preview`]
//! (for display); `Debug` is implemented by hand so the secret never ends up
//! in a log line by accident.

use crate::utils::prefix_with_suffix;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of leading token characters shown in previews
pub const PREVIEW_CHARS: usize = 10;

const PREVIEW_SUFFIX: &str = "...";

// ============================================================================
// Credential Counters
// ============================================================================

/// Monotonic per-credential counters
#[derive(Debug, Default)]
pub struct CredentialCounters {
    /// Successful completions attributed to this credential
    uses: AtomicU64,
    /// Failed attempts attributed to this credential
    failures: AtomicU64,
}

impl CredentialCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uses(&self) -> u64 {
        self.uses.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Record a success, returning the new total
    pub fn record_use(&self) -> u64 {
        self.uses.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a failure, returning the new total
    pub fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, Ordering::SeqCst) + 1
    }
}

// ============================================================================
// Credential
// ============================================================================

/// One API key in the rotation pool
pub struct Credential {
    token: String,
    counters: CredentialCounters,
}

impl Credential {
    /// Create a credential with zeroed counters
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            counters: CredentialCounters::new(),
        }
    }

    /// The raw secret, for building the outbound request only
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Redacted form of the token that is safe to log or return to clients
    pub fn preview(&self) -> String {
        prefix_with_suffix(&self.token, PREVIEW_CHARS, PREVIEW_SUFFIX)
    }

    pub fn uses(&self) -> u64 {
        self.counters.uses()
    }

    pub fn failures(&self) -> u64 {
        self.counters.failures()
    }

    pub fn record_use(&self) -> u64 {
        self.counters.record_use()
    }

    pub fn record_failure(&self) -> u64 {
        self.counters.record_failure()
    }

    /// Point-in-time counters for introspection
    pub fn snapshot(&self) -> CredentialStats {
        CredentialStats {
            preview: self.preview(),
            uses: self.uses(),
            failures: self.failures(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("preview", &self.preview())
            .field("uses", &self.uses())
            .field("failures", &self.failures())
            .finish()
    }
}

/// Per-credential entry of [`PoolStats`](super::PoolStats)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialStats {
    pub preview: String,
    pub uses: u64,
    pub failures: u64,
}
