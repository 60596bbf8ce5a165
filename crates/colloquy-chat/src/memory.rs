//! In-process conversation service.
//!
//! Backs the reference HTTP server and the tests. Chats and transcripts
//! live in mutex-guarded maps; replies come from a pluggable
//! [`ReplyGenerator`].

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use colloquy_core::{Chat, ChatId, ChatTranscript, Message, MessageId, Role};

use crate::error::ChatError;
use crate::service::ConversationService;

// =============================================================================
// Reply generation
// =============================================================================

/// Produces the assistant's answer to a user message.
pub trait ReplyGenerator: Send + Sync {
    /// `history` is the transcript up to and including `content`.
    fn generate(&self, history: &[Message], content: &str) -> String;
}

/// Replies by quoting the user's message. Mentioning "code" gets the quote
/// back inside a fenced block as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoReplyGenerator;

impl ReplyGenerator for EchoReplyGenerator {
    fn generate(&self, _history: &[Message], content: &str) -> String {
        if content.to_lowercase().contains("code") {
            format!("You said: {content}\n\n```text\n{content}\n```")
        } else {
            format!("You said: {content}")
        }
    }
}

/// Which message `submit_message` hands back to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitAck {
    /// The confirmed user message.
    #[default]
    User,
    /// The generated assistant reply.
    Assistant,
}

// =============================================================================
// MemoryConversationService
// =============================================================================

#[derive(Default)]
struct State {
    chats: HashMap<ChatId, Chat>,
    messages: HashMap<ChatId, Vec<Message>>,
}

/// Conversation service that keeps everything in memory.
pub struct MemoryConversationService {
    state: Mutex<State>,
    generator: Box<dyn ReplyGenerator>,
    ack: SubmitAck,
}

impl MemoryConversationService {
    /// Empty service replying with [`EchoReplyGenerator`].
    pub fn new() -> Self {
        Self::with_generator(EchoReplyGenerator)
    }

    pub fn with_generator(generator: impl ReplyGenerator + 'static) -> Self {
        Self {
            state: Mutex::new(State::default()),
            generator: Box::new(generator),
            ack: SubmitAck::default(),
        }
    }

    /// Choose which message submissions acknowledge with.
    pub fn with_ack(mut self, ack: SubmitAck) -> Self {
        self.ack = ack;
        self
    }

    pub fn chat_count(&self) -> usize {
        self.lock().chats.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryConversationService {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
impl ConversationService for MemoryConversationService {
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatError> {
        let state = self.lock();
        let mut chats: Vec<Chat> = state.chats.values().cloned().collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(chats)
    }

    async fn get_chat(&self, chat_id: &ChatId) -> Result<ChatTranscript, ChatError> {
        let state = self.lock();
        let chat = state
            .chats
            .get(chat_id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownChat(chat_id.clone()))?;
        let messages = state.messages.get(chat_id).cloned().unwrap_or_default();
        Ok(ChatTranscript { chat, messages })
    }

    async fn create_chat(&self, name: &str) -> Result<Chat, ChatError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::ValidationFailure(
                "chat name cannot be empty".to_string(),
            ));
        }
        let chat = Chat::new(new_id(), name, Utc::now());
        let mut state = self.lock();
        state.messages.insert(chat.id.clone(), Vec::new());
        state.chats.insert(chat.id.clone(), chat.clone());
        info!(chat_id = %chat.id, name = %chat.name, "Chat created");
        Ok(chat)
    }

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<(), ChatError> {
        let mut state = self.lock();
        if state.chats.remove(chat_id).is_none() {
            return Err(ChatError::UnknownChat(chat_id.clone()));
        }
        state.messages.remove(chat_id);
        info!(chat_id = %chat_id, "Chat deleted");
        Ok(())
    }

    async fn submit_message(&self, chat_id: &ChatId, content: &str) -> Result<Message, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::ValidationFailure(
                "message cannot be empty".to_string(),
            ));
        }

        let mut state = self.lock();
        let transcript = state
            .messages
            .get_mut(chat_id)
            .ok_or_else(|| ChatError::UnknownChat(chat_id.clone()))?;

        let user = Message {
            id: MessageId::new(new_id()),
            role: Role::User,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        transcript.push(user.clone());

        let reply_text = self.generator.generate(transcript, content);
        let reply = Message {
            id: MessageId::new(new_id()),
            role: Role::Assistant,
            content: reply_text,
            timestamp: Utc::now(),
        };
        transcript.push(reply.clone());

        debug!(
            chat_id = %chat_id,
            user_id = %user.id,
            reply_id = %reply.id,
            "Exchange stored"
        );

        Ok(match self.ack {
            SubmitAck::User => user,
            SubmitAck::Assistant => reply,
        })
    }

    async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, ChatError> {
        let state = self.lock();
        state
            .messages
            .get(chat_id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownChat(chat_id.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
