//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use crate::config::Settings;
use crate::services::{Dispatcher, GeminiProvider, KeyPool};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
///
/// Cheap to clone; the key pool and its counters are shared by every
/// handler through the dispatcher.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Rotating dispatcher over the configured key pool
    pub dispatcher: Arc<Dispatcher>,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Build the key pool and Gemini provider from settings
    ///
    /// Fails when no usable key is configured; the server must not start in
    /// that case.
    pub fn new(settings: Settings) -> anyhow::Result<Self> {
        let pool = KeyPool::from_config_str(&settings.gemini_api_keys)
            .context("Invalid GEMINI_API_KEY")?;

        tracing::debug!(model = %settings.gemini_model, "Creating Gemini provider");
        let provider = GeminiProvider::new(settings.gemini_config())
            .context("Failed to build Gemini HTTP client")?;

        let dispatcher = Dispatcher::new(Arc::new(pool), Arc::new(provider))
            .with_attempt_timeout(settings.timeouts().attempt_timeout);

        tracing::info!(
            key_count = dispatcher.pool().len(),
            attempt_timeout = ?settings.timeouts().attempt_timeout,
            "Application state initialized successfully"
        );

        Ok(Self::with_dispatcher(settings, dispatcher))
    }

    /// Assemble state around an existing dispatcher
    pub fn with_dispatcher(settings: Settings, dispatcher: Dispatcher) -> Self {
        Self {
            settings: Arc::new(settings),
            dispatcher: Arc::new(dispatcher),
            start_time: Instant::now(),
        }
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_placeholder_keys() {
        let settings = Settings {
            gemini_api_keys: "your_gemini_api_key_here".to_string(),
            ..Settings::default()
        };
        let err = AppState::new(settings).unwrap_err();
        assert!(format!("{:#}", err).contains("no valid credentials"));
    }

    #[test]
    fn test_new_builds_pool() {
        let settings = Settings {
            gemini_api_keys: "AIzaSyKeyOne,AIzaSyKeyTwo".to_string(),
            attempt_timeout_seconds: 5,
            ..Settings::default()
        };
        let state = AppState::new(settings).unwrap();
        assert_eq!(state.dispatcher.pool().len(), 2);
    }
}
