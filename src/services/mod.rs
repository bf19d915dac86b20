//! Services module
//!
//! Contains the key pool, the rotating dispatcher and the provider
//! integrations it drives.

pub mod dispatcher;
pub mod gemini;
pub mod key_pool;
pub mod provider;

pub use dispatcher::{DispatchError, Dispatcher};
pub use gemini::{GeminiConfig, GeminiProvider};
pub use key_pool::{ConfigError, Credential, CredentialStats, KeyPool, PoolStats};
pub use provider::{ProviderError, ProviderErrorKind, TextProvider};
