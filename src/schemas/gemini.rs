//! Google Gemini API schema definitions
//!
//! Request and response bodies for the `generateContent` REST endpoint,
//! limited to the single-turn text exchange the dispatcher performs.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request Types
// ============================================================================

/// Gemini API request body for generateContent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    /// The content of the conversation
    pub contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    /// Single user turn containing `prompt`
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![GeminiContent::user(prompt)],
        }
    }
}

/// Content block containing role and parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    /// Role: "user" or "model"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl GeminiContent {
    /// Create a user content
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

/// A part of the content; only text parts are produced or consumed here
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Gemini API response for generateContent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    /// Generated candidates
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Present when the prompt itself was blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,

    /// Usage metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate, if it has any
    pub fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    /// Why no text came back, for error reporting
    pub fn block_reason(&self) -> Option<&str> {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return Some(reason);
        }
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
    }
}

/// A candidate response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The generated content; absent when generation was blocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<GeminiContent>,

    /// Finish reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Prompt-level feedback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

/// Usage metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: i32,

    #[serde(default)]
    pub candidates_token_count: i32,

    #[serde(default)]
    pub total_token_count: i32,
}

// ============================================================================
// Error Types
// ============================================================================

/// Gemini API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiError {
    /// Error details
    pub error: GeminiErrorDetail,
}

/// Gemini error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiErrorDetail {
    /// Error code
    pub code: i32,

    /// Error message
    pub message: String,

    /// Error status, e.g. `RESOURCE_EXHAUSTED`
    #[serde(default)]
    pub status: String,

    /// Structured details; invalid keys are only identified here
    #[serde(default)]
    pub details: Vec<ErrorInfo>,
}

impl GeminiErrorDetail {
    /// Machine-readable reasons from `details`, e.g. `API_KEY_INVALID`
    pub fn reasons(&self) -> Vec<&str> {
        self.details
            .iter()
            .filter_map(|d| d.reason.as_deref())
            .collect()
    }
}

/// One entry of `error.details` (`google.rpc.ErrorInfo` and friends)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

// ============================================================================
// Model Constants
// ============================================================================

/// Default Gemini model
pub mod models {
    pub const GEMINI_2_5_FLASH: &str = "gemini-2.5-flash";
}
