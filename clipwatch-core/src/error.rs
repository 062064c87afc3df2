//! Validation errors shared across crates

use thiserror::Error;

/// A request or provider payload that cannot be accepted as-is
///
/// Validation errors are surfaced immediately and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
