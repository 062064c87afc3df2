//! Error types for the job tracker

use clipwatch_client::ClientError;
use clipwatch_core::ValidationError;
use thiserror::Error;

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors surfaced to callers of the [`crate::Tracker`] facade
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A provider call failed (credentials, transport, API error)
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Malformed request or provider payload
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job {0} is not tracked")]
    JobNotFound(String),

    /// The job exists but the operation does not apply to its current state
    #[error("{0}")]
    InvalidState(String),

    #[error("Invalid tracker configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound(_))
    }
}
