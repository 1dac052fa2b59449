//! Error types for Rewind

use std::io;
use thiserror::Error;

/// Result type for Rewind operations
pub type Result<T> = std::result::Result<T, RewindError>;

/// Errors that can occur in Rewind
#[derive(Debug, Error)]
pub enum RewindError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Request or response body cannot be rendered as comparable text
    #[error("Unsupported body: {0}")]
    UnsupportedBody(String),

    /// Unmatched request and the policy forbids recording and pass-through
    #[error("Recording disabled: no recorded interaction for {method} {uri}")]
    RecordingDisabled {
        /// Request method
        method: String,
        /// Normalized request URI
        uri: String,
    },

    /// Writing the cassette failed
    #[error("Failed to persist cassette {path}: {reason}")]
    Persistence {
        /// Storage location being written
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Invalid cassette file format
    #[error("Invalid cassette format: {0}")]
    InvalidFormat(String),

    /// The real transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport was used after `close()`
    #[error("Transport already closed")]
    TransportClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RewindError {
    /// Whether this error was raised by body normalization
    #[must_use]
    pub fn is_unsupported_body(&self) -> bool {
        matches!(self, Self::UnsupportedBody(_))
    }

    /// Whether this error is a policy refusal
    #[must_use]
    pub fn is_recording_disabled(&self) -> bool {
        matches!(self, Self::RecordingDisabled { .. })
    }
}
