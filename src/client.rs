//! HTTP client for the chat server.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use tracing::debug;
use url::Url;

use crate::csrf;
use crate::error::{ChatError, Result};
use crate::types::{
    DeleteResponse, MessageForm, NewChatResponse, RenameResponse, SessionSummary,
    SessionsResponse,
};

/// HTTP client for the chat server's page and session API.
///
/// Every state-changing request carries the CSRF token in the
/// `X-CSRFToken` header. Cookies set by the server are kept for later
/// requests, as a browser would.
///
/// # Example
///
/// ```rust,no_run
/// use jira_chat_client::client::ChatClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ChatClient::new("http://localhost:8000")?.with_csrf_token("token");
///
/// for session in client.list_sessions().await? {
///     println!("{} ({} messages)", session.session_id, session.message_count);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: Url,
    http: reqwest::Client,
    cookies: Arc<Jar>,
    csrf_token: String,
}

impl ChatClient {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the server (e.g., "http://localhost:8000")
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_connect_timeout(base_url, None)
    }

    /// Create a client that gives up connecting after `timeout`.
    ///
    /// No overall request timeout is set: replies stream for as long as the
    /// server keeps sending.
    pub fn with_connect_timeout(
        base_url: impl AsRef<str>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let cookies = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder().cookie_provider(Arc::clone(&cookies));
        if let Some(timeout) = timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(Self {
            base_url,
            http: builder.build()?,
            cookies,
            csrf_token: String::new(),
        })
    }

    /// Use this CSRF token for state-changing requests.
    #[must_use]
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = token.into();
        self
    }

    /// The CSRF token in use; empty if none was found.
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chat page
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the chat page and find the CSRF token it was rendered with.
    ///
    /// Falls back to the `csrftoken` cookie the page response set.
    pub async fn discover_csrf_token(&self, page_path: &str) -> Result<Option<String>> {
        let url = self.url(page_path)?;
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        let token = csrf::from_html(&html).or_else(|| {
            self.cookies
                .cookies(&url)
                .and_then(|header| header.to_str().ok().and_then(csrf::from_cookie_header))
        });
        debug!(name: "csrf.discovered", found = token.is_some(), "CSRF token lookup finished");
        Ok(token)
    }

    /// Post a message to the chat page.
    ///
    /// Returns the response with its body unread so the reply can be
    /// streamed. Fails with [`ChatError::Http`] on a non-success status.
    pub async fn send_message(&self, page_path: &str, form: &MessageForm) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(self.url(page_path)?)
            .header(csrf::HEADER, &self.csrf_token)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        debug!(name: "chat.message.response", status = status.as_u16(), "Message posted");
        if status.is_success() {
            Ok(response)
        } else {
            Err(ChatError::Http {
                status: status.as_u16(),
            })
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session API
    // ─────────────────────────────────────────────────────────────────────────

    /// List the user's chat sessions.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let response = self
            .http
            .get(self.url("/api/chat-sessions/")?)
            .send()
            .await?;
        let body: SessionsResponse = Self::handle_response(response).await?;
        Ok(body.sessions)
    }

    /// Create a session and return its ID.
    pub async fn new_chat(&self) -> Result<String> {
        let response = self
            .http
            .post(self.url("/api/new-chat/")?)
            .header(csrf::HEADER, &self.csrf_token)
            .send()
            .await?;
        let body: NewChatResponse = Self::handle_response(response).await?;
        body.session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChatError::Rejected("no session_id in response".into()))
    }

    /// Rename a session and return the title the server stored.
    pub async fn rename_chat(&self, session_id: &str, title: &str) -> Result<String> {
        let response = self
            .http
            .post(self.session_url("rename-chat", session_id)?)
            .header(csrf::HEADER, &self.csrf_token)
            .form(&[("title", title)])
            .send()
            .await?;
        let body: RenameResponse = Self::handle_response(response).await?;
        if body.success {
            Ok(body.title.unwrap_or_else(|| title.to_string()))
        } else {
            Err(ChatError::Rejected(format!("rename of {session_id} refused")))
        }
    }

    /// Delete a session.
    pub async fn delete_chat(&self, session_id: &str) -> Result<()> {
        let response = self
            .http
            .post(self.session_url("delete-chat", session_id)?)
            .header(csrf::HEADER, &self.csrf_token)
            .send()
            .await?;
        let body: DeleteResponse = Self::handle_response(response).await?;
        if body.success {
            Ok(())
        } else {
            Err(ChatError::Rejected(format!("delete of {session_id} refused")))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// `/api/<action>/<session_id>/`, with the ID encoded as one segment.
    fn session_url(&self, action: &str, session_id: &str) -> Result<Url> {
        let mut url = self.url("/api/")?;
        url.path_segments_mut()
            .map_err(|()| ChatError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(action)
            .push(session_id)
            .push("");
        Ok(url)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            Err(ChatError::Http {
                status: status.as_u16(),
            })
        }
    }
}
