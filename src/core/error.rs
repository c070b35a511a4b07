//! Error types and handling for the Augment bridge.
//!
//! This module provides a unified error type [`AppError`] that wraps the
//! various error sources of the HTTP layer and implements conversion into
//! the structured `{"error": {...}}` body the plugin expects.

use crate::core::config::MAX_REQUEST_BODY_BYTES;
use crate::core::error_types::{
    ERROR_CODE_INTERNAL, ERROR_CODE_INVALID_REQUEST, ERROR_CODE_MARSHAL_FAILED,
    ERROR_CODE_PAYLOAD_TOO_LARGE, ERROR_CODE_TIMEOUT, ERROR_CODE_UPSTREAM, ERROR_TYPE_API, ERROR_TYPE_INTERNAL,
    ERROR_TYPE_INVALID_REQUEST, ERROR_TYPE_TIMEOUT,
};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the application.
///
/// All errors that reach a handler boundary are converted to this type for
/// consistent HTTP handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    /// HTTP request errors from the upstream client
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The inbound request body could not be decoded
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The inbound request body exceeds the accepted size
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The translated request could not be re-serialized
    #[error("failed to marshal request: {0}")]
    Marshal(serde_json::Error),

    /// Stream transcoding failed (sink closed, lock poisoned)
    #[error("Stream error: {0}")]
    Transcode(#[from] crate::transformer::TranscodeError),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_TYPE_INTERNAL,
                ERROR_CODE_INTERNAL,
            ),
            AppError::Request(e) => {
                if e.is_timeout() {
                    (StatusCode::GATEWAY_TIMEOUT, ERROR_TYPE_TIMEOUT, ERROR_CODE_TIMEOUT)
                } else {
                    (StatusCode::BAD_GATEWAY, ERROR_TYPE_API, ERROR_CODE_UPSTREAM)
                }
            }
            AppError::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                ERROR_TYPE_INVALID_REQUEST,
                ERROR_CODE_INVALID_REQUEST,
            ),
            AppError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ERROR_TYPE_INVALID_REQUEST,
                ERROR_CODE_PAYLOAD_TOO_LARGE,
            ),
            AppError::Marshal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_TYPE_INTERNAL,
                ERROR_CODE_MARSHAL_FAILED,
            ),
            AppError::Transcode(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_TYPE_INTERNAL,
                ERROR_CODE_INTERNAL,
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code) = self.parts();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
                "code": code
            }
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge {
                limit: MAX_REQUEST_BODY_BYTES,
            }
        } else {
            AppError::InvalidRequest(rejection.body_text())
        }
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
