//! Contract of the remote conversation service.

use async_trait::async_trait;

use colloquy_core::{Chat, ChatId, ChatTranscript, Message, Role};

use crate::error::ChatError;

/// Remote persistence and reply generation.
///
/// Every call may fail with [`ChatError::NetworkFailure`]; calls naming a
/// chat the service does not know fail with [`ChatError::UnknownChat`].
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// All chats, in any order.
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatError>;

    /// A chat with its full transcript.
    async fn get_chat(&self, chat_id: &ChatId) -> Result<ChatTranscript, ChatError>;

    /// Create a chat. The service assigns the id and creation time.
    async fn create_chat(&self, name: &str) -> Result<Chat, ChatError>;

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), ChatError>;

    /// Persist a user message and generate the reply.
    ///
    /// Returns whichever message the service reports back: either the
    /// confirmed user message or the generated assistant reply.
    async fn submit_message(&self, chat_id: &ChatId, content: &str) -> Result<Message, ChatError>;

    /// The chat's transcript in conversational order.
    async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, ChatError>;
}

/// Confirmed user message and assistant reply for one submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedExchange {
    pub user: Message,
    pub reply: Message,
}

/// Pair a submission result with the other half of the exchange.
///
/// `submitted` is what [`ConversationService::submit_message`] returned;
/// `transcript` is the chat's transcript fetched after the submission.
/// Returns `None` when the transcript does not contain the submitted
/// message itself or the missing half next to it.
pub fn resolve_exchange(submitted: Message, transcript: &[Message]) -> Option<ResolvedExchange> {
    let pos = transcript.iter().position(|m| m.id == submitted.id)?;

    match submitted.role {
        Role::User => {
            let reply = transcript[pos + 1..]
                .iter()
                .find(|m| m.role == Role::Assistant)?
                .clone();
            Some(ResolvedExchange {
                user: submitted,
                reply,
            })
        }
        Role::Assistant => {
            let user = transcript[..pos]
                .iter()
                .rev()
                .find(|m| m.role == Role::User)?
                .clone();
            Some(ResolvedExchange {
                user,
                reply: submitted,
            })
        }
    }
}
