//! Chat pane markup.

use std::fmt::Write as _;

use crate::ui::escape::escape_html;
use crate::view::{ChatMessage, ChatView, InputState, MessageRole, StreamState};

/// Status line shown when auto-assign is on.
pub const AUTO_ASSIGN_ON: &str = "✅ ON - Tickets will be assigned to you";
/// Status line shown when auto-assign is off.
pub const AUTO_ASSIGN_OFF: &str = "❌ OFF - Tickets will remain unassigned";

/// Status text for the auto-assign toggle.
#[must_use]
pub fn toggle_status_text(auto_assign: bool) -> &'static str {
    if auto_assign { AUTO_ASSIGN_ON } else { AUTO_ASSIGN_OFF }
}

/// Render the auto-assign status line.
#[must_use]
pub fn render_toggle_status(auto_assign: bool) -> String {
    let class = if auto_assign {
        "text-success d-block"
    } else {
        "text-muted d-block"
    };
    format!(
        r#"<small id="toggleStatus" class="{class}">{}</small>"#,
        toggle_status_text(auto_assign)
    )
}

/// Render one completed message bubble.
#[must_use]
pub fn render_message(message: &ChatMessage) -> String {
    let text = escape_html(&message.text);
    match message.role {
        MessageRole::User => {
            format!(r#"<div class="user-message"><strong>You:</strong> {text}</div>"#)
        }
        MessageRole::Bot => {
            format!(r#"<div class="bot-message"><strong>AI:</strong> {text}</div>"#)
        }
        MessageRole::Error => format!(
            r#"<div class="bot-message" style="border-left-color: #dc3545; background: #f8d7da;"><strong>Error:</strong> {text}</div>"#
        ),
    }
}

/// Render the reply that is still streaming.
#[must_use]
pub fn render_pending(state: &StreamState) -> String {
    let class = if state.is_loading() {
        "bot-message message-loading"
    } else {
        "bot-message"
    };
    format!(
        r#"<div class="{class}"><strong>AI:</strong> <span class="response-content">{}</span></div>"#,
        escape_html(state.display_text())
    )
}

/// Render the message input form.
#[must_use]
pub fn render_input(input: &InputState) -> String {
    let disabled = if input.enabled { "" } else { " disabled" };
    format!(
        r#"<form id="chat-form"><input id="user-input" name="user_input" value="{}"{disabled}><button type="submit"{disabled}>{}</button></form>"#,
        escape_html(&input.value),
        escape_html(input.button_label)
    )
}

/// Render the whole message pane.
///
/// `data-scroll` carries the view's scroll revision so the page can follow
/// new content.
#[must_use]
pub fn render_chat(view: &ChatView) -> String {
    let mut html = format!(
        r#"<div id="chat-messages" data-scroll="{}">"#,
        view.scroll_revision()
    );
    for message in view.messages() {
        html.push_str(&render_message(message));
    }
    if let Some(state) = view.pending() {
        html.push_str(&render_pending(state));
    }
    html.push_str("</div>");

    if !view.title().is_empty() {
        let _ = write!(html, r#"<h5 id="chatTitle">{}</h5>"#, escape_html(view.title()));
    }
    html.push_str(&render_input(view.input()));
    html
}
