//! Jira chat client
//!
//! Streaming client for the Jira chatbot web application: sends messages to
//! the chat page, decodes the chunked reply as it arrives, and keeps an
//! in-memory view-model of the chat pane and session sidebar.
//!
//! # Architecture
//!
//! - **Transport**: [`client::ChatClient`] wraps the page and session endpoints
//! - **Streaming**: [`stream`] turns a chunked body into text fragments using
//!   the incremental decoder in [`decode`]
//! - **View-model**: [`view`] and [`session`] hold everything shown on screen
//! - **Rendering**: [`ui`] projects the view-model to HTML
//! - **Controller**: [`app::StreamingChatClient`] ties them together
//!
//! # Modules
//!
//! - [`app`]: submit orchestration and session actions
//! - [`client`]: HTTP API
//! - [`config`]: layered configuration
//! - [`csrf`]: CSRF token discovery
//! - [`decode`]: incremental UTF-8 decoder
//! - [`error`]: error taxonomy
//! - [`events`]: per-submit progress events
//! - [`preferences`]: persisted toggle state
//! - [`session`]: sidebar view-model
//! - [`state`]: injected startup state
//! - [`stream`]: reply fragment streams
//! - [`types`]: wire types
//! - [`ui`]: HTML projection
//! - [`view`]: chat pane view-model

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod app;
pub mod client;
pub mod config;
pub mod csrf;
pub mod decode;
pub mod error;
pub mod events;
pub mod preferences;
pub mod session;
pub mod state;
pub mod stream;
pub mod types;
pub mod ui;
pub mod view;

pub use app::{ChatSettings, StreamingChatClient, SubmitOutcome};
pub use client::ChatClient;
pub use error::{ChatError, Result};
