//! Shared constants for the error kinds surfaced to clients.

use std::fmt;

pub const ERROR_TYPE_INVALID_MODEL: &str = "invalid_model";
pub const ERROR_TYPE_AUTHENTICATION: &str = "authentication_error";
pub const ERROR_TYPE_API: &str = "api_error";
pub const ERROR_TYPE_TIMEOUT: &str = "timeout_error";
pub const ERROR_TYPE_CONNECTION: &str = "connection_error";
pub const ERROR_TYPE_INTERNAL: &str = "internal_error";
pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_NOT_IMPLEMENTED: &str = "not_implemented";
pub const ERROR_TYPE_NOT_FOUND: &str = "not_found";

/// Outcome label recorded for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOutcome {
    Success,
    ApiError,
    Timeout,
    ConnectionError,
}

impl UpstreamOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ApiError => ERROR_TYPE_API,
            Self::Timeout => ERROR_TYPE_TIMEOUT,
            Self::ConnectionError => ERROR_TYPE_CONNECTION,
        }
    }
}

impl fmt::Display for UpstreamOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
