//! Error types for directory operations.

use thiserror::Error;

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the remote directory.
#[derive(Error, Debug)]
pub enum Error {
    /// The API answered with a non-2xx status.
    #[error("{operation}: status {status}, body {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connect, timeout, TLS).
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be understood.
    #[error("{operation}: invalid response: {reason}")]
    InvalidResponse { operation: String, reason: String },

    /// Configuration error.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// URL parse error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a status error.
    pub fn status(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            operation: operation.into(),
            source,
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this error is plausibly transient.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_carries_operation() {
        let err = Error::status("create_team", 409, "conflict");
        assert_eq!(err.to_string(), "create_team: status 409, body conflict");
        assert_eq!(err.status_code(), Some(409));
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(Error::status("fetch_memberships", 503, "").is_retryable());
        assert!(Error::status("fetch_memberships", 429, "").is_retryable());
        assert!(!Error::status("fetch_memberships", 404, "").is_retryable());
    }

    #[test]
    fn test_config_error_not_retryable() {
        assert!(!Error::config("missing token").is_retryable());
        assert!(!Error::invalid_response("find_users_by_email", "bad json").is_retryable());
    }
}
