//! Colloquy API crate - reference conversation server.
//!
//! Serves the chat REST contract (`/chats`, `/chats/{id}`,
//! `/chats/{id}/messages`) plus `/health` over any
//! [`colloquy_chat::ConversationService`], by default the in-memory one.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, serve, start_server};
pub use state::AppState;
