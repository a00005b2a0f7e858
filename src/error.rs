//! Error types for the chat client.

use std::time::Duration;

use thiserror::Error;

/// Chat client error type.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The submitted text was empty after trimming. Never shown to the user.
    #[error("Message is empty")]
    EmptyInput,

    /// The request could not be sent or the body could not be read.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP error! status: {status}")]
    Http {
        /// HTTP status code.
        status: u16,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No bytes arrived on the response stream within the idle limit.
    #[error("No data received for {0:?}")]
    Timeout(Duration),

    /// The in-flight response was cancelled.
    #[error("Response stream cancelled")]
    Cancelled,

    /// A message is already being sent.
    #[error("A message is already being sent")]
    Busy,

    /// The operation needs a current chat session.
    #[error("No current chat session")]
    NoSession,

    /// The server answered but reported `success: false`.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Local file access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Whether this error is rendered as an error bubble.
    #[must_use]
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, Self::EmptyInput | Self::Cancelled | Self::Busy)
    }
}

/// Result type alias for chat client operations.
pub type Result<T> = std::result::Result<T, ChatError>;
