//! HTTP client for the remote conversation service.
//!
//! [`HttpConversationService`] implements
//! [`colloquy_chat::ConversationService`] over the REST contract served by
//! `colloquy-api`.

pub mod client;
pub mod error;

pub use client::HttpConversationService;
pub use error::RemoteError;
