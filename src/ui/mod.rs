//! HTML projection of the view-model.
//!
//! Rendering is a pure function of [`ChatView`](crate::view::ChatView) and
//! [`SessionList`](crate::session::SessionList): no state lives in the markup.
//! Class names match the server's chat template so the output can be swapped
//! into the page as-is.
//!
//! # Structure
//!
//! - [`escape`]: text-to-HTML escaping
//! - [`chat`]: message pane, input area and auto-assign status
//! - [`sidebar`]: session list

pub mod chat;
pub mod escape;
pub mod sidebar;

pub use chat::{render_chat, render_input, render_message, render_pending, render_toggle_status};
pub use escape::{escape_html, unescape_html};
pub use sidebar::render_session_list;
