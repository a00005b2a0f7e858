//! The chat page controller.
//!
//! [`StreamingChatClient`] owns the view-model and drives it from user
//! actions: sending a message and streaming the reply, loading the session
//! sidebar, creating, renaming and deleting sessions.
//!
//! # Example
//!
//! ```rust,no_run
//! use jira_chat_client::app::{ChatSettings, StreamingChatClient};
//! use jira_chat_client::client::ChatClient;
//! use jira_chat_client::state::InitialState;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new("http://localhost:8000")?;
//! let chat = StreamingChatClient::new(client, InitialState::default(), ChatSettings::default());
//!
//! chat.submit_with("Create a bug for the login page", |event| {
//!     println!("{event:?}");
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client::ChatClient;
use crate::error::{ChatError, Result};
use crate::events::ChatEvent;
use crate::session::{Navigation, SessionList};
use crate::state::InitialState;
use crate::stream::{StreamOptions, stream_response};
use crate::types::MessageForm;
use crate::ui;
use crate::view::{ChatView, SUBMIT_FAILED};

/// Behaviour settings for a chat page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSettings {
    /// Initial state of the auto-assign toggle.
    pub auto_assign: bool,
    /// Fail a reply that sends nothing for this long.
    pub idle_timeout: Option<Duration>,
}

/// How a submit ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The message was empty after trimming; nothing was sent or rendered.
    Ignored,
    /// The reply streamed to completion.
    Completed {
        /// The full reply.
        reply: String,
    },
    /// The reply was cancelled; partial text stays rendered.
    Cancelled {
        /// Text received before cancellation.
        partial: String,
    },
    /// The submit failed and an error bubble was rendered.
    Failed {
        /// What went wrong.
        error: ChatError,
    },
}

/// Controller for one chat page.
///
/// Cheap to clone; clones share the same view. Only one message may be in
/// flight at a time: a second [`submit`](Self::submit) while one is running
/// fails with [`ChatError::Busy`].
#[derive(Debug, Clone)]
pub struct StreamingChatClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    client: ChatClient,
    page_path: String,
    current_session_id: Option<String>,
    view: RwLock<ChatView>,
    sessions: RwLock<SessionList>,
    auto_assign: AtomicBool,
    idle_timeout: Option<Duration>,
    in_flight: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

/// Releases the submit lock when dropped, however the submit ends.
struct SubmitGuard<'a> {
    inner: &'a Inner,
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        {
            let mut view = self.inner.write_view();
            view.abandon_stream();
            view.unlock_input();
        }
        *self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

impl Inner {
    fn read_view(&self) -> RwLockReadGuard<'_, ChatView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_view(&self) -> RwLockWriteGuard<'_, ChatView> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_sessions(&self) -> RwLockReadGuard<'_, SessionList> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, SessionList> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StreamingChatClient {
    /// Build the controller for a page and render its stored history.
    #[must_use]
    pub fn new(client: ChatClient, initial: InitialState, settings: ChatSettings) -> Self {
        let page_path = initial.page_path();

        let mut view = ChatView::new();
        view.load_history(&initial.chat_history);
        if let Some(title) = &initial.chat_title {
            view.set_title(title.clone());
        }

        let client = match initial.csrf_token {
            Some(token) if client.csrf_token().is_empty() => client.with_csrf_token(token),
            _ => client,
        };

        Self {
            inner: Arc::new(Inner {
                client,
                page_path,
                current_session_id: initial.current_session_id.clone(),
                view: RwLock::new(view),
                sessions: RwLock::new(SessionList::new(initial.current_session_id)),
                auto_assign: AtomicBool::new(settings.auto_assign),
                idle_timeout: settings.idle_timeout,
                in_flight: AtomicBool::new(false),
                cancel: Mutex::new(None),
            }),
        }
    }

    /// Path messages are posted to.
    pub fn page_path(&self) -> &str {
        &self.inner.page_path
    }

    /// Session the page is showing.
    pub fn current_session_id(&self) -> Option<&str> {
        self.inner.current_session_id.as_deref()
    }

    /// Snapshot of the chat pane.
    pub fn view(&self) -> ChatView {
        self.inner.read_view().clone()
    }

    /// Snapshot of the session sidebar.
    pub fn sessions(&self) -> SessionList {
        self.inner.read_sessions().clone()
    }

    /// Render the chat pane as HTML.
    pub fn render_chat(&self) -> String {
        ui::render_chat(&self.inner.read_view())
    }

    /// Render the session sidebar as HTML.
    pub fn render_sessions(&self) -> String {
        ui::render_session_list(&self.inner.read_sessions())
    }

    pub fn auto_assign(&self) -> bool {
        self.inner.auto_assign.load(Ordering::Relaxed)
    }

    /// Flip the auto-assign toggle; returns the new status text.
    pub fn set_auto_assign(&self, enabled: bool) -> &'static str {
        self.inner.auto_assign.store(enabled, Ordering::Relaxed);
        info!(name: "chat.auto_assign.changed", enabled, "Auto-assign toggled");
        ui::chat::toggle_status_text(enabled)
    }

    /// Whether a message is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Cancel the reply in flight, if any.
    pub fn cancel(&self) -> bool {
        let guard = self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submit
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a message and stream the reply into the view.
    pub async fn submit(&self, message: &str) -> Result<SubmitOutcome> {
        self.submit_with(message, |_| {}).await
    }

    /// Send a message, reporting progress to `on_event`.
    ///
    /// Failures are rendered as an error bubble and returned as
    /// [`SubmitOutcome::Failed`]; only [`ChatError::Busy`] is returned as an
    /// error. The input is re-enabled on every path, including when the
    /// returned future is dropped early.
    pub async fn submit_with<F>(&self, message: &str, mut on_event: F) -> Result<SubmitOutcome>
    where
        F: FnMut(&ChatEvent) + Send,
    {
        let message = message.trim();
        if message.is_empty() {
            debug!(name: "chat.submit.ignored", "Empty message not sent");
            return Ok(SubmitOutcome::Ignored);
        }

        let (guard, cancel) = self.begin_submit()?;
        let request_id = Uuid::new_v4().to_string();
        info!(
            name: "chat.submit.started",
            request_id = %request_id,
            chars = message.chars().count(),
            "Submitting message"
        );
        on_event(&ChatEvent::SubmitStarted {
            request_id: request_id.clone(),
        });

        {
            let mut view = self.inner.write_view();
            view.lock_input();
            view.push_user(message);
        }
        on_event(&ChatEvent::UserMessage {
            text: message.to_string(),
        });

        let outcome = match self.exchange(message, cancel, &mut on_event).await {
            Ok(reply) => {
                info!(name: "chat.submit.completed", request_id = %request_id, chars = reply.chars().count(), "Reply complete");
                on_event(&ChatEvent::ResponseComplete {
                    text: reply.clone(),
                });
                SubmitOutcome::Completed { reply }
            }
            Err(ChatError::Cancelled) => {
                let partial = self.inner.write_view().abandon_stream().unwrap_or_default();
                warn!(name: "chat.submit.cancelled", request_id = %request_id, "Reply cancelled");
                on_event(&ChatEvent::Cancelled {
                    partial: partial.clone(),
                });
                SubmitOutcome::Cancelled { partial }
            }
            Err(error) => {
                error!(name: "chat.submit.failed", request_id = %request_id, error = %error, "Submit failed");
                {
                    let mut view = self.inner.write_view();
                    view.abandon_stream();
                    view.push_error(SUBMIT_FAILED);
                }
                on_event(&ChatEvent::Failed {
                    message: SUBMIT_FAILED.to_string(),
                    detail: error.to_string(),
                });
                SubmitOutcome::Failed { error }
            }
        };

        drop(guard);
        on_event(&ChatEvent::InputUnlocked);
        Ok(outcome)
    }

    fn begin_submit(&self) -> Result<(SubmitGuard<'_>, CancellationToken)> {
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(name: "chat.submit.busy", "A message is already in flight");
            return Err(ChatError::Busy);
        }

        let cancel = CancellationToken::new();
        *self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());
        Ok((SubmitGuard { inner: &self.inner }, cancel))
    }

    async fn exchange<F>(
        &self,
        message: &str,
        cancel: CancellationToken,
        on_event: &mut F,
    ) -> Result<String>
    where
        F: FnMut(&ChatEvent) + Send,
    {
        let form = MessageForm {
            user_input: message.to_string(),
            auto_assign: self.auto_assign(),
        };

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ChatError::Cancelled),
            response = self.inner.client.send_message(&self.inner.page_path, &form) => response?,
        };

        {
            let mut view = self.inner.write_view();
            view.begin_stream();
            view.mark_receiving();
        }
        on_event(&ChatEvent::ResponseStarted);

        let mut fragments = stream_response(
            response,
            StreamOptions {
                cancel,
                idle_timeout: self.inner.idle_timeout,
            },
        );
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            self.inner.write_view().append_fragment(&fragment);
            on_event(&ChatEvent::Fragment { text: fragment });
        }

        Ok(self.inner.write_view().finish_stream().unwrap_or_default())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the session list and render it into the sidebar.
    pub async fn load_sessions(&self) -> Result<()> {
        let sessions = self.inner.client.list_sessions().await?;
        debug!(name: "chat.sessions.loaded", count = sessions.len(), "Session list loaded");
        self.inner.write_sessions().replace(sessions);
        Ok(())
    }

    /// Select a sidebar entry.
    pub fn click_session(&self, session_id: &str) -> Navigation {
        self.inner.read_sessions().click(session_id)
    }

    /// Whether the rename and delete controls are shown.
    pub fn controls_visible(&self) -> bool {
        self.inner.read_sessions().controls_visible()
    }

    /// Create a session and navigate to it.
    pub async fn new_chat(&self) -> Result<Navigation> {
        let session_id = self.inner.client.new_chat().await?;
        info!(name: "chat.session.created", session_id = %session_id, "New chat created");
        Ok(Navigation::Session(session_id))
    }

    /// Rename the current session.
    ///
    /// The title is trimmed and must not be empty. On success the header is
    /// updated and the sidebar reloaded.
    pub async fn rename_chat(&self, title: &str) -> Result<String> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let session_id = self
            .inner
            .current_session_id
            .as_deref()
            .ok_or(ChatError::NoSession)?;

        let stored = self.inner.client.rename_chat(session_id, title).await?;
        info!(name: "chat.session.renamed", session_id = %session_id, title = %stored, "Chat renamed");
        self.inner.write_view().set_title(stored.clone());
        self.load_sessions().await?;
        Ok(stored)
    }

    /// Delete the current session and navigate to a fresh chat.
    pub async fn delete_chat(&self) -> Result<Navigation> {
        let session_id = self
            .inner
            .current_session_id
            .as_deref()
            .ok_or(ChatError::NoSession)?;

        self.inner.client.delete_chat(session_id).await?;
        info!(name: "chat.session.deleted", session_id = %session_id, "Chat deleted");
        Ok(Navigation::Home)
    }
}
