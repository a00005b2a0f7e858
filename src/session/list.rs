//! Session list view-model.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use url::Url;

use crate::types::SessionSummary;

/// Title shown for sessions the user never named.
pub const DEFAULT_TITLE: &str = "New Chat";

static PAGE_ROOT: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/").expect("valid page root"));

/// Path of the page showing a session.
///
/// The ID is percent-encoded as a single path segment.
#[must_use]
pub fn chat_path(session_id: &str) -> String {
    let mut url = PAGE_ROOT.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push("chat").push(session_id).push("");
    }
    url.path().to_string()
}

/// Format a server timestamp as a short date (`5/1/2024`).
///
/// The date is taken in the timestamp's own offset. Values that do not parse
/// are shown as sent.
#[must_use]
pub fn display_date(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));

    match date {
        Ok(date) => date.format("%-m/%-d/%Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Where the page should go after a sidebar action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Navigation {
    /// Remain on the current page.
    Stay,
    /// Load the page of this session.
    Session(String),
    /// Load the start page, where the next message opens a new chat.
    Home,
}

impl Navigation {
    /// Path of the page to load; `None` when staying put.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        match self {
            Self::Stay => None,
            Self::Session(id) => Some(chat_path(id)),
            Self::Home => Some("/".to_string()),
        }
    }
}

/// One row of the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    pub session_id: String,
    /// Title to show; [`DEFAULT_TITLE`] when the session has none.
    pub title: String,
    pub message_count: u64,
    /// Short date of the last activity.
    pub last_activity: String,
    /// Whether this is the session the page is showing.
    pub active: bool,
}

impl SessionEntry {
    fn from_summary(summary: SessionSummary, current: Option<&str>) -> Self {
        let title = summary
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let last_activity = display_date(summary.last_activity.as_deref());
        let active = current == Some(summary.session_id.as_str());

        Self {
            session_id: summary.session_id,
            title,
            message_count: summary.message_count,
            last_activity,
            active,
        }
    }
}

/// The sidebar: sessions in server order plus the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionList {
    current: Option<String>,
    entries: Vec<SessionEntry>,
}

impl SessionList {
    /// An empty sidebar for the page showing `current`.
    #[must_use]
    pub fn new(current: Option<String>) -> Self {
        Self {
            current,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Replace all rows with a fresh listing from the server.
    pub fn replace(&mut self, sessions: Vec<SessionSummary>) {
        let current = self.current.as_deref();
        self.entries = sessions
            .into_iter()
            .map(|s| SessionEntry::from_summary(s, current))
            .collect();
    }

    #[must_use]
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<&SessionEntry> {
        self.entries.iter().find(|e| e.session_id == session_id)
    }

    /// Select a row. The current session stays put; any other navigates.
    #[must_use]
    pub fn click(&self, session_id: &str) -> Navigation {
        if self.current.as_deref() == Some(session_id) {
            Navigation::Stay
        } else {
            Navigation::Session(session_id.to_string())
        }
    }

    /// Rename/delete controls are shown only for an existing session.
    #[must_use]
    pub fn controls_visible(&self) -> bool {
        self.current.is_some()
    }
}
