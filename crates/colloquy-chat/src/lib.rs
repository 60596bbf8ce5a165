//! Conversation synchronisation for Colloquy.
//!
//! Holds the client's view of chats and transcripts ([`SessionStore`]),
//! the contract of the remote conversation service
//! ([`ConversationService`]), and the [`Reconciler`] that keeps the two
//! consistent under optimistic sends.

pub mod error;
pub mod memory;
pub mod reconciler;
pub mod service;
pub mod store;
pub mod sync;

pub use error::ChatError;
pub use memory::{EchoReplyGenerator, MemoryConversationService, ReplyGenerator, SubmitAck};
pub use reconciler::{Reconciler, SendOutcome};
pub use service::{resolve_exchange, ConversationService, ResolvedExchange};
pub use store::{lock_store, SessionStore, SharedStore};
