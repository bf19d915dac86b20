//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::{DispatchError, ProviderErrorKind};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Dispatch(err) if err.kind() == ProviderErrorKind::Timeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request_error",
            ApiError::Dispatch(err) if err.is_exhausted() => "pool_exhausted_error",
            ApiError::Dispatch(_) => "provider_error",
            ApiError::Internal(_) => "api_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.error_type();

        // Message-only; the underlying key never appears in provider errors
        let message = match &self {
            ApiError::InvalidRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error_type = error_type, error = %message, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: message,
            error_type: error_type.to_string(),
        });

        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "type")]
    pub error_type: String,
}
