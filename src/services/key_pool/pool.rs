//! Key Pool Implementation
//!
//! This module provides `KeyPool`, the ordered set of credentials that the
//! dispatcher rotates through, together with its construction rules and
//! read-only statistics.

use super::credential::{Credential, CredentialStats};
use super::rotation::RotationCursor;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Sample values shipped in `.env` templates; never valid credentials
pub const PLACEHOLDER_KEYS: &[&str] = &[
    "your_api_key_here",
    "your_gemini_api_key_here",
    "your_actual_gemini_api_key_here",
    "test_key",
    "REPLACE_WITH_YOUR_ACTUAL_GEMINI_API_KEY",
];

// ============================================================================
// Errors
// ============================================================================

/// The pool could not be built; fatal at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no credentials supplied")]
    NoCredentials,

    #[error("no valid credentials after filtering placeholders ({rejected} rejected)")]
    AllFiltered { rejected: usize },
}

// ============================================================================
// Key Pool
// ============================================================================

/// An ordered, non-empty pool of credentials with a shared rotation cursor
///
/// Positions are stable for the lifetime of the pool and serve as the
/// credential's identity in logs and statistics.
#[derive(Debug)]
pub struct KeyPool {
    credentials: Vec<Credential>,
    cursor: RotationCursor,
}

impl KeyPool {
    /// Build a pool from a comma-separated configuration string
    pub fn from_config_str(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        Self::from_tokens(raw.split(','))
    }

    /// Build a pool from already split candidates
    ///
    /// Candidates are trimmed; blanks, repeats and known placeholders are
    /// dropped while the order of the survivors is preserved.
    pub fn from_tokens<I, S>(candidates: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();
        let mut candidate_count = 0usize;
        let mut rejected = 0usize;

        for candidate in candidates {
            let token = candidate.as_ref().trim();
            if token.is_empty() {
                continue;
            }
            candidate_count += 1;

            if is_placeholder(token) || !seen.insert(token.to_string()) {
                rejected += 1;
                continue;
            }
            accepted.push(Credential::new(token));
        }

        if candidate_count == 0 {
            return Err(ConfigError::NoCredentials);
        }
        if accepted.is_empty() {
            return Err(ConfigError::AllFiltered { rejected });
        }

        if rejected > 0 {
            tracing::warn!(
                rejected = rejected,
                "Ignored placeholder or duplicate API keys"
            );
        }
        tracing::info!(key_count = accepted.len(), "Initialized API keys for rotation");

        Ok(Self {
            cursor: RotationCursor::new(accepted.len()),
            credentials: accepted,
        })
    }

    /// Select the credential under the cursor and advance the cursor
    ///
    /// Returns the zero-based position together with the credential.
    pub fn select_next(&self) -> (usize, &Credential) {
        let index = self.cursor.advance();
        (index, &self.credentials[index])
    }

    /// Get all credentials in pool order
    pub fn all(&self) -> &[Credential] {
        &self.credentials
    }

    /// Number of credentials; never zero
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false for a constructed pool
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Position the next selection will start from
    pub fn cursor_position(&self) -> usize {
        self.cursor.peek()
    }

    /// Record a successful completion for the credential at `index`
    pub fn record_use(&self, index: usize) -> u64 {
        self.credentials
            .get(index)
            .map(Credential::record_use)
            .unwrap_or(0)
    }

    /// Record a failed attempt for the credential at `index`
    pub fn record_failure(&self, index: usize) -> u64 {
        self.credentials
            .get(index)
            .map(Credential::record_failure)
            .unwrap_or(0)
    }

    /// Get pool statistics without touching counters or the cursor
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_credentials: self.credentials.len(),
            per_credential: self.credentials.iter().map(Credential::snapshot).collect(),
        }
    }
}

fn is_placeholder(token: &str) -> bool {
    PLACEHOLDER_KEYS.contains(&token)
}

// ============================================================================
// Pool Statistics
// ============================================================================

/// Snapshot of pool usage for operational visibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Number of credentials in the pool
    pub total_credentials: usize,
    /// Counters per credential, in pool order
    pub per_credential: Vec<CredentialStats>,
}

impl PoolStats {
    pub fn total_uses(&self) -> u64 {
        self.per_credential.iter().map(|c| c.uses).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.per_credential.iter().map(|c| c.failures).sum()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pool: &KeyPool) -> Vec<&str> {
        pool.all().iter().map(Credential::token).collect()
    }

    #[test]
    fn test_from_config_str_trims_and_keeps_order() {
        let pool = KeyPool::from_config_str(" key-a , key-b,key-c ").unwrap();
        assert_eq!(tokens(&pool), vec!["key-a", "key-b", "key-c"]);
        assert_eq!(pool.cursor_position(), 0);
    }

    #[test]
    fn test_blank_and_duplicate_entries_removed() {
        let pool = KeyPool::from_config_str("key-a,,  ,key-b,key-a,key-c,key-b").unwrap();
        assert_eq!(tokens(&pool), vec!["key-a", "key-b", "key-c"]);
    }

    #[test]
    fn test_empty_input_is_config_error() {
        assert_eq!(KeyPool::from_config_str("").unwrap_err(), ConfigError::NoCredentials);
        assert_eq!(KeyPool::from_config_str("   ").unwrap_err(), ConfigError::NoCredentials);
        assert_eq!(KeyPool::from_config_str(" , ,").unwrap_err(), ConfigError::NoCredentials);
    }

    #[test]
    fn test_placeholder_rejected() {
        let err = KeyPool::from_config_str("your_api_key_here").unwrap_err();
        assert_eq!(err, ConfigError::AllFiltered { rejected: 1 });
    }

    #[test]
    fn test_all_placeholders_rejected() {
        let raw = PLACEHOLDER_KEYS.join(",");
        let err = KeyPool::from_config_str(&raw).unwrap_err();
        assert_eq!(
            err,
            ConfigError::AllFiltered {
                rejected: PLACEHOLDER_KEYS.len()
            }
        );
    }

    #[test]
    fn test_placeholders_dropped_next_to_real_keys() {
        let pool = KeyPool::from_config_str("test_key,real-key-1,your_gemini_api_key_here").unwrap();
        assert_eq!(tokens(&pool), vec!["real-key-1"]);
    }

    #[test]
    fn test_rotation_fairness() {
        let pool = KeyPool::from_config_str("k1,k2,k3").unwrap();

        // Start mid-pool to check "from wherever the cursor is"
        pool.select_next();

        let picked: Vec<usize> = (0..3).map(|_| pool.select_next().0).collect();
        assert_eq!(picked, vec![1, 2, 0]);
    }

    #[test]
    fn test_wraparound() {
        let pool = KeyPool::from_config_str("k1,k2,k3").unwrap();
        let picked: Vec<&str> = (0..4).map(|_| pool.select_next().1.token()).collect();
        assert_eq!(picked, vec!["k1", "k2", "k3", "k1"]);
    }

    #[test]
    fn test_single_key_pool_repeats() {
        let pool = KeyPool::from_config_str("only").unwrap();
        assert_eq!(pool.select_next().0, 0);
        assert_eq!(pool.select_next().0, 0);
    }

    #[test]
    fn test_record_counters() {
        let pool = KeyPool::from_config_str("k1,k2").unwrap();
        assert_eq!(pool.record_failure(0), 1);
        assert_eq!(pool.record_use(1), 1);
        assert_eq!(pool.record_use(1), 2);
        // Out of range is ignored
        assert_eq!(pool.record_use(9), 0);

        let stats = pool.stats();
        assert_eq!(stats.per_credential[0].failures, 1);
        assert_eq!(stats.per_credential[1].uses, 2);
        assert_eq!(stats.total_uses(), 2);
        assert_eq!(stats.total_failures(), 1);
    }

    #[test]
    fn test_stats_do_not_mutate() {
        let pool = KeyPool::from_config_str("AIzaSyFirstKey123,AIzaSySecondKey456").unwrap();
        pool.select_next();
        pool.record_use(0);

        let before = pool.stats();
        let cursor = pool.cursor_position();
        for _ in 0..10 {
            pool.stats();
        }
        assert_eq!(pool.stats(), before);
        assert_eq!(pool.cursor_position(), cursor);
    }

    #[test]
    fn test_stats_serialize_with_previews_only() {
        let pool = KeyPool::from_config_str("AIzaSyFirstKey123SECRET").unwrap();
        let json = serde_json::to_value(pool.stats()).unwrap();

        assert_eq!(json["totalCredentials"], 1);
        assert_eq!(json["perCredential"][0]["preview"], "AIzaSyFirs...");
        assert_eq!(json["perCredential"][0]["uses"], 0);
        assert!(!json.to_string().contains("SECRET"));
    }
}
