//! Events emitted while a message is being sent.
//!
//! [`ChatEvent`] lets a front end follow a submit as it happens (print
//! fragments as they arrive, show the error bubble) without polling the
//! view-model.
//!
//! # Example
//!
//! ```rust
//! use jira_chat_client::events::ChatEvent;
//!
//! let event = ChatEvent::Fragment {
//!     text: "Hello".to_string(),
//! };
//! let line = event.to_json_line();
//! assert!(line.contains("message.delta"));
//! ```

use serde::{Deserialize, Serialize};

/// Notifications for one submit, in the order they occur.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// A non-empty message was accepted and the input locked.
    #[serde(rename = "submit.start")]
    SubmitStarted {
        /// Identifier correlating this submit's events and logs.
        request_id: String,
    },

    /// The user's message was rendered.
    #[serde(rename = "message.user")]
    UserMessage {
        /// The trimmed message text.
        text: String,
    },

    /// The server accepted the message and the reply placeholder is shown.
    #[serde(rename = "response.start")]
    ResponseStarted,

    /// A decoded fragment was appended to the reply.
    #[serde(rename = "message.delta")]
    Fragment {
        /// The text fragment appended.
        text: String,
    },

    /// The reply stream ended normally.
    #[serde(rename = "response.done")]
    ResponseComplete {
        /// The full reply.
        text: String,
    },

    /// The reply was cancelled; any partial text stays rendered.
    #[serde(rename = "response.cancelled")]
    Cancelled {
        /// Text received before cancellation.
        partial: String,
    },

    /// The submit failed and an error bubble was rendered.
    #[serde(rename = "error")]
    Failed {
        /// Text of the rendered error bubble.
        message: String,
        /// Underlying error, for logs.
        detail: String,
    },

    /// The input control is enabled again.
    #[serde(rename = "input.unlocked")]
    InputUnlocked,
}

impl ChatEvent {
    /// Serialize as one line of JSON (for `--output events`).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","data":{{"message":"serialization failed","detail":"{e}"}}}}"#)
        })
    }
}
