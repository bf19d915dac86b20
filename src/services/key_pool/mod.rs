//! Key Pool Module
//!
//! This module manages the set of interchangeable API keys used for
//! outbound generation calls: construction and placeholder filtering,
//! round-robin selection, and per-key usage/failure counters.
//!
//! # Example
//! ```
//! use gemini_key_rotator::services::key_pool::KeyPool;
//!
//! let pool = KeyPool::from_config_str("key-one, key-two").unwrap();
//! let (index, credential) = pool.select_next();
//! assert_eq!(index, 0);
//! assert_eq!(credential.token(), "key-one");
//! assert_eq!(pool.select_next().0, 1);
//! ```

mod credential;
mod pool;
mod rotation;

pub use credential::{Credential, CredentialCounters, CredentialStats, PREVIEW_CHARS};
pub use pool::{ConfigError, KeyPool, PoolStats, PLACEHOLDER_KEYS};
pub use rotation::RotationCursor;
