//! Utility modules
//!
//! Contains string helpers and timeout handling.

pub mod string;
pub mod timeout;

pub use string::{
    estimate_tokens, prefix_with_suffix, strip_code_fences, truncate_str, truncate_with_suffix,
};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
