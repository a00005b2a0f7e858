//! In-memory view-model of the chat pane.
//!
//! Everything the page shows lives here; HTML is rendered from it by
//! [`crate::ui`]. Messages are append-only and never edited once pushed.

use serde::{Deserialize, Serialize};

use crate::state::HistoryEntry;

/// Placeholder shown in a bot message before its reply starts.
pub const THINKING: &str = "Thinking...";
/// Label of the submit button when idle.
pub const SEND_LABEL: &str = "Send";
/// Label of the submit button while a message is in flight.
pub const SENDING_LABEL: &str = "Sending...";
/// Text of the error bubble shown when a submit fails.
pub const SUBMIT_FAILED: &str = "Sorry, something went wrong. Please try again.";

/// Author of a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
    Error,
}

/// A message as rendered in the chat pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Bot,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Error,
            text: text.into(),
        }
    }
}

/// Reply being streamed into the pane.
///
/// Lives only while its response is open; completion seals it into a
/// [`ChatMessage`] via [`finish`](Self::finish).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    text: String,
    receiving: bool,
}

impl StreamState {
    /// A reply that has not started arriving.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The response head arrived; the placeholder is cleared.
    pub fn mark_receiving(&mut self) {
        self.receiving = true;
    }

    /// Append a decoded fragment.
    pub fn append(&mut self, fragment: &str) {
        self.receiving = true;
        self.text.push_str(fragment);
    }

    /// Text received so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// What the pane shows for this reply right now.
    #[must_use]
    pub fn display_text(&self) -> &str {
        if self.receiving { &self.text } else { THINKING }
    }

    /// Whether the placeholder is still showing.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.receiving
    }

    /// Seal the reply into an immutable bot message.
    #[must_use]
    pub fn finish(self) -> ChatMessage {
        ChatMessage::bot(self.text)
    }
}

/// State of the message input and its submit button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    pub enabled: bool,
    pub value: String,
    pub button_label: &'static str,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            enabled: true,
            value: String::new(),
            button_label: SEND_LABEL,
        }
    }
}

/// The chat pane.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatView {
    title: String,
    messages: Vec<ChatMessage>,
    pending: Option<StreamState>,
    input: InputState,
    scroll_revision: u64,
}

impl ChatView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the pane from stored history, replacing anything shown.
    pub fn load_history(&mut self, history: &[HistoryEntry]) {
        self.messages.clear();
        self.pending = None;
        for entry in history {
            self.messages.push(ChatMessage::user(&entry.user_message));
            self.messages.push(ChatMessage::bot(&entry.bot_response));
        }
        self.scroll_to_bottom();
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Completed messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The reply currently streaming, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&StreamState> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Incremented whenever the pane should show its latest content.
    #[must_use]
    pub fn scroll_revision(&self) -> u64 {
        self.scroll_revision
    }

    /// Number of error bubbles shown.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Error)
            .count()
    }

    pub fn set_input_value(&mut self, value: impl Into<String>) {
        self.input.value = value.into();
    }

    /// Disable the input while a message is in flight and clear its value.
    pub fn lock_input(&mut self) {
        self.input.enabled = false;
        self.input.value.clear();
        self.input.button_label = SENDING_LABEL;
    }

    /// Re-enable the input.
    pub fn unlock_input(&mut self) {
        self.input.enabled = true;
        self.input.button_label = SEND_LABEL;
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(ChatMessage::user(text));
    }

    pub fn push_error(&mut self, text: impl Into<String>) {
        self.push(ChatMessage::error(text));
    }

    /// Show the placeholder bot message for a reply.
    ///
    /// A reply still pending from an earlier stream is sealed first.
    pub fn begin_stream(&mut self) {
        self.seal_pending();
        self.pending = Some(StreamState::new());
        self.scroll_to_bottom();
    }

    /// The response head arrived; replace the placeholder with an empty reply.
    pub fn mark_receiving(&mut self) {
        if let Some(state) = self.pending.as_mut() {
            state.mark_receiving();
        }
    }

    /// Append a fragment to the streaming reply and follow it.
    pub fn append_fragment(&mut self, fragment: &str) {
        let state = self.pending.get_or_insert_with(StreamState::new);
        state.append(fragment);
        self.scroll_to_bottom();
    }

    /// Seal the streaming reply into a bot message and return its text.
    pub fn finish_stream(&mut self) -> Option<String> {
        let state = self.pending.take()?;
        let message = state.finish();
        let text = message.text.clone();
        self.push(message);
        Some(text)
    }

    /// End the streaming reply after a failure or cancellation.
    ///
    /// Text already received stays on screen; an empty reply is dropped.
    pub fn abandon_stream(&mut self) -> Option<String> {
        let state = self.pending.take()?;
        if state.text().is_empty() {
            return None;
        }
        let message = state.finish();
        let text = message.text.clone();
        self.push(message);
        Some(text)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_revision += 1;
    }

    fn seal_pending(&mut self) {
        if self.pending.is_some() {
            self.abandon_stream();
        }
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.scroll_to_bottom();
    }
}
