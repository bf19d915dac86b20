//! Gemini provider for Google Gemini API interactions
//!
//! Implements [`TextProvider`] over the `generateContent` REST endpoint.
//! The key to use is supplied per call by the dispatcher; this type holds
//! no credentials of its own. All HTTP and API failures are translated into
//! classified [`ProviderError`]s here.

use crate::schemas::gemini::{models, GeminiError, GeminiRequest, GeminiResponse};
use crate::services::provider::{ProviderError, ProviderErrorKind, TextProvider};
use crate::utils::truncate_with_suffix;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Upper bound for raw (non-JSON) error bodies carried in messages
const MAX_ERROR_BODY_CHARS: usize = 500;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Model name (default: gemini-2.5-flash)
    pub model: String,

    /// Base URL (default: generativelanguage.googleapis.com)
    pub base_url: Option<String>,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: models::GEMINI_2_5_FLASH.to_string(),
            base_url: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Gemini Provider
// ============================================================================

/// REST client for Gemini text generation
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let base_url = config
            .base_url
            .unwrap_or_else(|| GEMINI_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        tracing::info!(
            model = %config.model,
            base_url = %base_url,
            timeout_secs = config.timeout.as_secs(),
            "Initialized Gemini provider"
        );

        Ok(Self {
            client,
            base_url,
            model: config.model,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Generate content (non-streaming) with an explicit key
    pub async fn generate_content(
        &self,
        api_key: &str,
        request: &GeminiRequest,
    ) -> Result<GeminiResponse, ProviderError> {
        let url = self.generate_url();

        tracing::debug!(model = %self.model, url = %url, "Calling Gemini generateContent API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(map_api_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Gemini response");
            ProviderError::new(
                ProviderErrorKind::Other,
                format!("Failed to parse Gemini response: {}", e),
            )
        })
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn send(&self, token: &str, prompt: &str) -> Result<String, ProviderError> {
        let request = GeminiRequest::from_prompt(prompt);
        let response = self.generate_content(token, &request).await?;

        if let Some(usage) = &response.usage_metadata {
            tracing::debug!(
                model = %self.model,
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "Gemini reported token usage"
            );
        }

        response.text().ok_or_else(|| {
            let reason = response.block_reason().unwrap_or("no candidates");
            ProviderError::new(
                ProviderErrorKind::Other,
                format!("Gemini returned no text ({})", reason),
            )
        })
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Translate a non-2xx response into a classified error
///
/// The message keeps the `[code Reason] message` shape so operators see the
/// same text the Gemini SDKs print. Reasons from `error.details` are appended
/// so that a bad key reported as `400 INVALID_ARGUMENT` still classifies as
/// unauthorized.
pub fn map_api_error(status: StatusCode, body: &str) -> ProviderError {
    let (code, detail) = match serde_json::from_str::<GeminiError>(body) {
        Ok(parsed) => {
            let error = parsed.error;
            let code = u16::try_from(error.code).unwrap_or(status.as_u16());
            let mut detail = error.message.clone();
            if !error.status.is_empty() {
                detail = format!("{} ({})", detail, error.status);
            }
            let reasons = error.reasons();
            if !reasons.is_empty() {
                detail = format!("{} [{}]", detail, reasons.join(", "));
            }
            (code, detail)
        }
        Err(_) => (
            status.as_u16(),
            truncate_with_suffix(body.trim(), MAX_ERROR_BODY_CHARS, "..."),
        ),
    };

    let reason = StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Error");

    let message = format!("[{} {}] {}", code, reason, detail);
    ProviderError::new(ProviderErrorKind::from_status(code, &message), message)
}

/// Translate a transport-level reqwest failure
pub fn map_transport_error(err: reqwest::Error) -> ProviderError {
    let message = err.to_string();
    if err.is_timeout() {
        ProviderError::timeout(format!("Gemini request timeout: {}", message))
    } else if err.is_connect() {
        ProviderError::new(
            ProviderErrorKind::Unavailable,
            format!("Gemini connection failed: {}", message),
        )
    } else if let Some(status) = err.status() {
        ProviderError::new(ProviderErrorKind::from_status(status.as_u16(), &message), message)
    } else {
        ProviderError::from_message(message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_generate_url() {
        let provider = GeminiProvider::new(
            GeminiConfig::new("gemini-2.0-flash").with_base_url("http://localhost:9999/v1beta/"),
        )
        .unwrap();
        assert_eq!(
            provider.generate_url(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_map_rate_limit_error() {
        let body = r#"{"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = map_api_error(StatusCode::TOO_MANY_REQUESTS, body);
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
        assert!(err.message.starts_with("[429 Too Many Requests]"));
        assert!(err.message.contains("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn test_map_invalid_key_error() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        let err = map_api_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_expired_key_from_details_is_retryable() {
        let body = r#"{"error":{"code":400,"message":"API key expired. Please renew the API key.","status":"INVALID_ARGUMENT","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID"}]}}"#;
        let err = map_api_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, ProviderErrorKind::Unauthorized);
        assert!(err.is_retryable());
        assert_eq!(
            err.message,
            "[400 Bad Request] API key expired. Please renew the API key. (INVALID_ARGUMENT) [API_KEY_INVALID]"
        );
    }

    #[test]
    fn test_map_reason_follows_body_code() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let err = map_api_error(StatusCode::BAD_REQUEST, body);
        assert!(err.message.starts_with("[429 Too Many Requests]"));
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);
    }

    #[test]
    fn test_map_bad_request_is_not_retryable() {
        let body = r#"{"error": {"code": 400, "message": "Invalid JSON payload received.", "status": "INVALID_ARGUMENT"}}"#;
        let err = map_api_error(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, ProviderErrorKind::Other);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_map_unparseable_error_body() {
        let err = map_api_error(StatusCode::SERVICE_UNAVAILABLE, "upstream connect error");
        assert_eq!(err.kind, ProviderErrorKind::Unavailable);
        assert_eq!(err.message, "[503 Service Unavailable] upstream connect error");
    }

    #[test]
    fn test_map_long_html_body_is_truncated() {
        let body = format!("<html>{}</html>", "x".repeat(2000));
        let err = map_api_error(StatusCode::BAD_GATEWAY, &body);
        assert!(err.message.ends_with("..."));
        assert!(err.message.chars().count() < 600);
    }
}
