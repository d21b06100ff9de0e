//! Error taxonomy for the interception layer.

use thiserror::Error;

use crate::listener::ListenerId;

/// Errors surfaced by registration and dispatch.
#[derive(Debug, Clone, Error)]
pub enum MuxError {
    /// Registration without an action, or an unrecognised argument shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A listener pattern failed validation while matching a request.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A listener action failed (returned an error or panicked).
    #[error("listener {listener} failed: {message}")]
    ActionFailure { listener: ListenerId, message: String },
}

impl MuxError {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        MuxError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for mux operations.
pub type MuxResult<T> = Result<T, MuxError>;
