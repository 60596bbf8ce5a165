//! Error types for conversation synchronisation.

use colloquy_core::{ChatId, MessageId};

/// Errors from the session store, the reconciler and conversation services.
///
/// None of these is fatal: the store stays usable after any of them and
/// no partially applied state survives the failing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("unknown chat: {0}")]
    UnknownChat(ChatId),
    #[error("message {message_id} not found in chat {chat_id}")]
    MessageNotFound {
        chat_id: ChatId,
        message_id: MessageId,
    },
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("validation failed: {0}")]
    ValidationFailure(String),
    #[error("a message is already being sent in chat {0}")]
    SendInFlight(ChatId),
}

impl ChatError {
    /// Whether the user should be told about this error.
    ///
    /// Network failures get a non-blocking notification; validation
    /// failures are silent no-ops; the rest are logged only.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, ChatError::NetworkFailure(_) | ChatError::SendInFlight(_))
    }
}
