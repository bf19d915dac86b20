//! Application settings and configuration
//!
//! This module provides configuration management for the application,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use crate::schemas::gemini::models;
use crate::services::GeminiConfig;
use crate::utils::TimeoutConfig;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Gemini settings
    /// Comma-separated API keys; parsed into the key pool at startup
    #[serde(skip_serializing)]
    pub gemini_api_keys: String,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,
    pub gemini_timeout_seconds: u64,

    /// Per-attempt deadline in seconds; 0 disables it
    pub attempt_timeout_seconds: u64,

    // Request limits
    pub max_prompt_chars: u64,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let settings = Self {
            // App settings
            app_name: env_or_default("APP_NAME", "gemini-key-rotator"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            // Server settings
            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "3000")
                .parse()
                .context("Invalid PORT value")?,

            // Gemini settings
            gemini_api_keys: env::var("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: env_or_default("GEMINI_MODEL", models::GEMINI_2_5_FLASH),
            gemini_base_url: env::var("GEMINI_BASE_URL").ok().filter(|v| !v.is_empty()),
            gemini_timeout_seconds: env_or_default("GEMINI_TIMEOUT_SECS", "120")
                .parse()
                .context("Invalid GEMINI_TIMEOUT_SECS value")?,
            attempt_timeout_seconds: env_or_default("ATTEMPT_TIMEOUT_SECS", "0")
                .parse()
                .context("Invalid ATTEMPT_TIMEOUT_SECS value")?,

            // Request limits
            max_prompt_chars: env_or_default("MAX_PROMPT_CHARS", "100000")
                .parse()
                .unwrap_or(100_000),
        };

        // Validate settings
        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    ///
    /// Key contents are checked when the pool is built; here only presence
    /// is required.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.gemini_api_keys.trim().is_empty() {
            anyhow::bail!("GEMINI_API_KEY not set; provide one or more comma-separated keys");
        }

        if self.gemini_timeout_seconds == 0 {
            anyhow::bail!("GEMINI_TIMEOUT_SECS must be > 0");
        }

        if self.max_prompt_chars == 0 {
            anyhow::bail!("MAX_PROMPT_CHARS must be > 0");
        }

        if self.attempt_timeout_seconds > self.gemini_timeout_seconds {
            tracing::warn!(
                attempt_timeout = self.attempt_timeout_seconds,
                http_timeout = self.gemini_timeout_seconds,
                "Attempt timeout exceeds HTTP timeout and will never fire"
            );
        }

        Ok(())
    }

    /// Provider configuration derived from these settings
    pub fn gemini_config(&self) -> GeminiConfig {
        let mut config = GeminiConfig::new(&self.gemini_model)
            .with_timeout(self.timeouts().http_timeout);
        if let Some(url) = &self.gemini_base_url {
            config = config.with_base_url(url);
        }
        config
    }

    /// Timeout configuration derived from these settings
    pub fn timeouts(&self) -> TimeoutConfig {
        TimeoutConfig::from_secs(self.gemini_timeout_seconds, self.attempt_timeout_seconds)
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "gemini-key-rotator".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            gemini_api_keys: String::new(),
            gemini_model: models::GEMINI_2_5_FLASH.to_string(),
            gemini_base_url: None,
            gemini_timeout_seconds: 120,
            attempt_timeout_seconds: 0,
            max_prompt_chars: 100_000,
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn with_keys(keys: &str) -> Settings {
        Settings {
            gemini_api_keys: keys.to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.app_name, "gemini-key-rotator");
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.gemini_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_validate_requires_keys() {
        assert!(Settings::default().validate().is_err());
        assert!(with_keys("  ").validate().is_err());
        assert!(with_keys("AIzaSyExample").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let settings = Settings {
            port: 0,
            ..with_keys("k")
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_keys_never_serialized() {
        let json = serde_json::to_string(&with_keys("AIzaSySecretValue")).unwrap();
        assert!(!json.contains("AIzaSySecretValue"));
        assert!(!json.contains("gemini_api_keys"));
    }

    #[test]
    fn test_derived_configs() {
        let settings = Settings {
            gemini_base_url: Some("http://localhost:8080".to_string()),
            gemini_timeout_seconds: 30,
            attempt_timeout_seconds: 10,
            ..with_keys("k")
        };

        let gemini = settings.gemini_config();
        assert_eq!(gemini.base_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(gemini.timeout, Duration::from_secs(30));
        assert_eq!(settings.timeouts().attempt_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_server_addr() {
        assert_eq!(Settings::default().server_addr(), "0.0.0.0:3000");
    }
}
