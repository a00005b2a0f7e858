//! Initial state injected at startup.
//!
//! The server renders the chat page with the current session and its history
//! already known. [`InitialState`] carries that data into the client
//! explicitly instead of through a global.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::chat_path;

/// One stored exchange of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// What the user sent.
    pub user_message: String,
    /// What the bot answered.
    pub bot_response: String,
}

/// Startup state for a chat page.
///
/// Field names follow the page's embedded `chatData` object, so a dump of
/// that object deserializes directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitialState {
    /// Session the page is showing, if any.
    pub current_session_id: Option<String>,
    /// Title shown in the chat header.
    pub chat_title: Option<String>,
    /// Token for state-changing requests.
    pub csrf_token: Option<String>,
    /// Exchanges already stored for the session, oldest first.
    pub chat_history: Vec<HistoryEntry>,
}

impl InitialState {
    /// State for the given session with no history.
    #[must_use]
    pub fn for_session(session_id: Option<String>) -> Self {
        Self {
            current_session_id: session_id,
            ..Self::default()
        }
    }

    /// Parse state from the page's JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read state from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Path of the page messages are posted to.
    #[must_use]
    pub fn page_path(&self) -> String {
        match &self.current_session_id {
            Some(id) => chat_path(id),
            None => "/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_page_chat_data() {
        let json = r#"{
            "currentSessionId": "s-42",
            "chatHistory": [
                {"user_message": "create a bug", "bot_response": "Created JIRA-1"}
            ]
        }"#;

        let state = InitialState::from_json(json).unwrap();
        assert_eq!(state.current_session_id.as_deref(), Some("s-42"));
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].bot_response, "Created JIRA-1");
        assert_eq!(state.csrf_token, None);
    }

    #[test]
    fn test_page_path() {
        assert_eq!(InitialState::default().page_path(), "/");
        assert_eq!(
            InitialState::for_session(Some("abc".into())).page_path(),
            "/chat/abc/"
        );
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, r#"{"currentSessionId": null, "chatHistory": []}"#)
            .await
            .unwrap();

        let state = InitialState::from_file(&path).await.unwrap();
        assert_eq!(state, InitialState::default());
    }
}
