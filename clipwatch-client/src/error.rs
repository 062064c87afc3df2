//! Error types for the provider client

use clipwatch_core::ValidationError;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when talking to a video-generation provider
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credentials or endpoints are missing; the job can never start
    #[error("{0}")]
    Configuration(String),

    /// Malformed request or provider payload
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Check if this error comes from missing configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Pulls a readable message out of a provider error body
///
/// Both providers wrap failures differently (`{"error": {"message": ..}}`,
/// `{"detail": ..}`, `{"error": ".."}`); fall back to the raw text.
pub(crate) fn error_message_from_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("detail"))
        .or_else(|| value.get("error"))
        .or_else(|| value.get("message"))
        .and_then(|v| v.as_str());
    match message {
        Some(message) => message.to_string(),
        None => body.trim().to_string(),
    }
}
