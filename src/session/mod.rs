//! Chat session sidebar.
//!
//! The sidebar lists the user's sessions as reported by the server and marks
//! the one the page is showing. Selecting an entry yields a [`Navigation`]
//! rather than changing location itself.
//!
//! # Example
//!
//! ```rust
//! use jira_chat_client::session::{Navigation, SessionList};
//! use jira_chat_client::types::SessionSummary;
//!
//! let mut list = SessionList::new(Some("a1".to_string()));
//! list.replace(vec![SessionSummary {
//!     session_id: "a1".into(),
//!     title: None,
//!     message_count: 2,
//!     last_activity: None,
//! }]);
//!
//! assert!(list.entries()[0].active);
//! assert_eq!(list.click("a1"), Navigation::Stay);
//! ```

mod list;

pub use list::{DEFAULT_TITLE, Navigation, SessionEntry, SessionList, chat_path, display_date};
