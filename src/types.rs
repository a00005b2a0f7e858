//! Wire types for the chat server's HTTP API.
//!
//! These mirror the JSON and form bodies exchanged with the server.

use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Chat Types
// =============================================================================

/// Form body posted to the chat page to send a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageForm {
    /// The user's message.
    pub user_input: String,
    /// Whether tickets created from this message are assigned to the user.
    pub auto_assign: bool,
}

// =============================================================================
// Session Types
// =============================================================================

/// Summary of one chat session as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub session_id: String,
    /// User-visible title; absent or empty for untitled chats.
    #[serde(default)]
    pub title: Option<String>,
    /// Number of exchanges in the session; `null` counts as zero.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message_count: u64,
    /// Timestamp of the last activity, as sent by the server.
    #[serde(default)]
    pub last_activity: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response from `GET /api/chat-sessions/`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsResponse {
    /// Sessions visible to the current user.
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

/// Response from `POST /api/new-chat/`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewChatResponse {
    /// Identifier of the created session, absent on failure.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response from `POST /api/rename-chat/<id>/`.
#[derive(Debug, Clone, Deserialize)]
pub struct RenameResponse {
    /// Whether the rename was applied.
    #[serde(default)]
    pub success: bool,
    /// The title now stored by the server.
    #[serde(default)]
    pub title: Option<String>,
}

/// Response from `POST /api/delete-chat/<id>/`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteResponse {
    /// Whether the session was deleted.
    #[serde(default)]
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_response_tolerates_missing_fields() {
        let json = r#"{"sessions": [
            {"session_id": "a1", "title": "Sprint bugs", "message_count": 4,
             "last_activity": "2024-05-01T12:30:00+00:00"},
            {"session_id": "b2", "title": null},
            {"session_id": "c3", "message_count": null, "last_activity": null}
        ]}"#;

        let parsed: SessionsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sessions.len(), 3);
        assert_eq!(parsed.sessions[0].message_count, 4);
        assert_eq!(parsed.sessions[1].title, None);
        assert_eq!(parsed.sessions[1].message_count, 0);
        assert_eq!(parsed.sessions[1].last_activity, None);
        assert_eq!(parsed.sessions[2].message_count, 0);
    }
}
