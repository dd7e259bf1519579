//! Error types and handling for the model router.
//!
//! [`RouterError`] is the single taxonomy surfaced to clients. Every variant
//! maps to an error kind string and an HTTP status, and renders either as a
//! JSON body or, once a stream has started, as a terminal SSE `error` event.

use crate::core::error_types::*;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum RouterError {
    /// Requested model is neither a registered model nor an alias of one
    #[error("Model '{requested}' not found. Available models: {}", .available.join(", "))]
    InvalidModel {
        requested: String,
        available: Vec<String>,
    },

    /// No credential configured for the resolved model
    #[error(
        "API key not configured for model '{display_name}'. Please set the {env_var} environment variable."
    )]
    Authentication {
        display_name: String,
        env_var: String,
    },

    /// Upstream provider answered with a non-2xx status
    #[error("Upstream API error ({provider}): {message}")]
    Api {
        status: u16,
        provider: String,
        message: String,
    },

    #[error("Request to {provider} timed out after {timeout_secs}s")]
    Timeout {
        provider: String,
        timeout_secs: u64,
    },

    /// Any transport failure other than the deadline
    #[error("Failed to connect to {provider}: {detail}")]
    Connection { provider: String, detail: String },

    /// Client sent a body we cannot route
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    NotFound(String),

    /// Known path called with an unsupported method
    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl RouterError {
    /// Error kind reported in `error.type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            RouterError::InvalidModel { .. } => ERROR_TYPE_INVALID_MODEL,
            RouterError::Authentication { .. } => ERROR_TYPE_AUTHENTICATION,
            RouterError::Api { .. } => ERROR_TYPE_API,
            RouterError::Timeout { .. } => ERROR_TYPE_TIMEOUT,
            RouterError::Connection { .. } => ERROR_TYPE_CONNECTION,
            RouterError::InvalidRequest(_) | RouterError::MethodNotAllowed(_) => {
                ERROR_TYPE_INVALID_REQUEST
            }
            RouterError::NotImplemented(_) => ERROR_TYPE_NOT_IMPLEMENTED,
            RouterError::NotFound(_) => ERROR_TYPE_NOT_FOUND,
            RouterError::Internal(_) => ERROR_TYPE_INTERNAL,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::InvalidModel { .. } | RouterError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            RouterError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            RouterError::Api { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            RouterError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RouterError::Connection { .. } => StatusCode::BAD_GATEWAY,
            RouterError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            RouterError::NotFound(_) => StatusCode::NOT_FOUND,
            RouterError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            RouterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_type(), self.to_string())
    }

    /// Render as a terminal SSE event for a stream that already started.
    pub fn to_sse_event(&self) -> String {
        self.to_error_response().to_sse_event()
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error_type = self.error_type(), error = %self, "Request failed");
        } else {
            tracing::debug!(error_type = self.error_type(), error = %self, "Request rejected");
        }
        (status, Json(self.to_error_response())).into_response()
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(e: serde_json::Error) -> Self {
        RouterError::Internal(e.to_string())
    }
}

/// Error detail information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Error body shared by every failure: `{type: "error", error: {type, message}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub response_type: String,
    pub error: ErrorDetail,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            response_type: "error".to_string(),
            error: ErrorDetail {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }

    pub fn to_sse_event(&self) -> String {
        let data = serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"type":"error","error":{{"type":"{}","message":"unserializable error"}}}}"#,
                self.error.error_type
            )
        });
        crate::transformer::stream::format_sse_event(Some("error"), &data)
    }
}

/// Convenience type alias for Results using [`RouterError`].
pub type Result<T> = std::result::Result<T, RouterError>;
