//! Generate endpoint
//!
//! `POST /api/generate` forwards a prompt through the rotating dispatcher
//! and relays either the generated text or the dispatch error.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ApiError;
use crate::server::state::AppState;
use crate::utils::strip_code_fences;

/// Request body for `POST /api/generate`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Prompt forwarded verbatim to the provider
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,

    /// Remove a surrounding markdown code fence from the answer
    #[serde(default)]
    pub strip_code_fences: bool,
}

/// Response body for a successful generation
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub text: String,
}

pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    validate_request(&request, state.settings.max_prompt_chars)?;

    let text = state.dispatcher.dispatch(&request.prompt).await?;

    let text = if request.strip_code_fences {
        strip_code_fences(&text).to_string()
    } else {
        text
    };

    Ok(Json(GenerateResponse { text }))
}

fn validate_request(request: &GenerateRequest, max_chars: u64) -> Result<(), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    if request.prompt.trim().is_empty() {
        return Err(ApiError::InvalidRequest("prompt is required".to_string()));
    }

    let chars = request.prompt.chars().count() as u64;
    if chars > max_chars {
        return Err(ApiError::InvalidRequest(format!(
            "prompt is too long ({} characters, maximum {})",
            chars, max_chars
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: prompt.to_string(),
            strip_code_fences: false,
        }
    }

    #[test]
    fn test_deserialize_camel_case() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"prompt": "hi", "stripCodeFences": true}"#).unwrap();
        assert_eq!(req.prompt, "hi");
        assert!(req.strip_code_fences);

        let req: GenerateRequest = serde_json::from_str(r#"{"prompt": "hi"}"#).unwrap();
        assert!(!req.strip_code_fences);
    }

    #[test]
    fn test_validate_rejects_empty_and_blank() {
        assert!(validate_request(&request(""), 100).is_err());
        assert!(validate_request(&request("  \n "), 100).is_err());
    }

    #[test]
    fn test_validate_enforces_max_chars() {
        assert!(validate_request(&request("abcd"), 4).is_ok());
        let err = validate_request(&request("abcde"), 4).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }
}
