//! Session sidebar markup.

use crate::session::{SessionEntry, SessionList};
use crate::ui::escape::escape_html;

fn render_entry(entry: &SessionEntry) -> String {
    let active = if entry.active { " active" } else { "" };
    format!(
        concat!(
            r#"<div class="list-group-item list-group-item-action{active}" data-session-id="{id}" style="cursor: pointer;">"#,
            r#"<div class="d-flex w-100 justify-content-between"><h6 class="mb-1">{title}</h6><small>{date}</small></div>"#,
            r#"<p class="mb-1">{count} messages</p></div>"#
        ),
        active = active,
        id = escape_html(&entry.session_id),
        title = escape_html(&entry.title),
        date = escape_html(&entry.last_activity),
        count = entry.message_count,
    )
}

/// Render the session list.
#[must_use]
pub fn render_session_list(list: &SessionList) -> String {
    let mut html = String::from(r#"<div id="chatSessions" class="list-group">"#);
    for entry in list.entries() {
        html.push_str(&render_entry(entry));
    }
    html.push_str("</div>");
    html
}
