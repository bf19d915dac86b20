//! Gemini key rotator library
//!
//! Round-robin dispatch of prompts across a pool of Gemini API keys, with
//! failover on rate limits and other retryable errors.

// Public modules
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod schemas;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use error::ApiError;
pub use server::App;
pub use services::{Dispatcher, KeyPool};
