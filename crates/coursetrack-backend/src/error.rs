//! Error types for backend operations.

use thiserror::Error;

/// Errors that can occur when talking to the learning backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request could not be sent or no response arrived.
    #[error("request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The requested course, module or item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A request URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl BackendError {
    /// Returns true if the failure happened before the backend answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
