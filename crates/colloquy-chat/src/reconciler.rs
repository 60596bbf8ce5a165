//! Optimistic message reconciler.
//!
//! Drives the send workflow: a provisional user message is shown before
//! the network call starts, swapped for the confirmed message when the
//! service answers, and removed again if anything fails. Reconciliation is
//! keyed by chat id, so switching chats mid-send is harmless.

use std::sync::Arc;

use tracing::{debug, info, warn};

use colloquy_core::config::ChatConfig;
use colloquy_core::{Chat, ChatId, Message, MessageId, Role};

use crate::error::ChatError;
use crate::service::{resolve_exchange, ConversationService};
use crate::store::{lock_store, SharedStore};

/// Result of a successful send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendOutcome {
    pub chat_id: ChatId,
    /// Confirmed user message, in the slot the provisional one held.
    pub user: Message,
    pub reply: Message,
    /// Set when the send had to create a chat first.
    pub created_chat: Option<Chat>,
}

/// Coordinates the session store with a remote conversation service.
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) store: SharedStore,
    pub(crate) service: Arc<dyn ConversationService>,
    pub(crate) config: ChatConfig,
}

impl Reconciler {
    pub fn new(store: SharedStore, service: Arc<dyn ConversationService>, config: ChatConfig) -> Self {
        Self {
            store,
            service,
            config,
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Send `text` to a chat, creating one first when `chat_id` is `None`.
    ///
    /// The provisional message is in the store before the first network
    /// call is made. On failure, or if the returned future is dropped
    /// before it completes, the store is put back exactly as it was.
    pub async fn send(&self, chat_id: Option<ChatId>, text: &str) -> Result<SendOutcome, ChatError> {
        let text = self.validate(text)?;

        let (chat_id, created_chat) = match chat_id {
            Some(id) => (id, None),
            None => {
                let name = self.config.default_chat_name.clone();
                let chat = self.create_chat(&name).await?;
                (chat.id.clone(), Some(chat))
            }
        };

        let provisional = Message::provisional_user(text);
        let mut guard = {
            let mut store = lock_store(&self.store);
            store.begin_send(&chat_id)?;
            if let Err(e) = store.append_provisional(&chat_id, provisional.clone()) {
                store.end_send(&chat_id);
                return Err(e);
            }
            SendGuard::new(self.store.clone(), chat_id.clone(), provisional.id.clone())
        };
        debug!(chat_id = %chat_id, temp_id = %provisional.id, "Provisional message inserted");

        match self.exchange(&mut guard, text).await {
            Ok((user, reply)) => {
                guard.settle();
                info!(
                    chat_id = %chat_id,
                    user_id = %user.id,
                    reply_id = %reply.id,
                    "Message sent"
                );
                Ok(SendOutcome {
                    chat_id,
                    user,
                    reply,
                    created_chat,
                })
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Send failed, rolling back");
                drop(guard);
                Err(e)
            }
        }
    }

    /// Submit, confirm the user message, then attach the reply.
    async fn exchange(&self, guard: &mut SendGuard, text: &str) -> Result<(Message, Message), ChatError> {
        let chat_id = guard.chat_id.clone();
        let submitted = self.service.submit_message(&chat_id, text).await?;

        // A user acknowledgement is confirmed before the reply is fetched.
        if submitted.role == Role::User {
            guard.confirm(submitted.clone())?;
        }

        let transcript = self.service.list_messages(&chat_id).await?;
        let submitted_id = submitted.id.clone();
        let exchange = resolve_exchange(submitted, &transcript).ok_or_else(|| {
            ChatError::NetworkFailure(format!(
                "no matching reply for message {submitted_id} in chat {chat_id}"
            ))
        })?;

        if !guard.is_confirmed() {
            guard.confirm(exchange.user.clone())?;
        }
        guard.attach_reply(exchange.reply.clone())?;
        Ok((exchange.user, exchange.reply))
    }

    fn validate<'a>(&self, text: &'a str) -> Result<&'a str, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::ValidationFailure(
                "message cannot be empty".to_string(),
            ));
        }
        let max = self.config.max_message_length;
        if trimmed.chars().count() > max {
            return Err(ChatError::ValidationFailure(format!(
                "message exceeds {max} characters"
            )));
        }
        Ok(trimmed)
    }
}

// =============================================================================
// SendGuard
// =============================================================================

/// Tracks what one send has put into the store and undoes it unless the
/// send settles.
struct SendGuard {
    store: SharedStore,
    chat_id: ChatId,
    /// Id of the message currently holding the send's slot, if this send
    /// still owns one.
    slot: Option<MessageId>,
    confirmed: bool,
    settled: bool,
}

impl SendGuard {
    fn new(store: SharedStore, chat_id: ChatId, temp_id: MessageId) -> Self {
        Self {
            store,
            chat_id,
            slot: Some(temp_id),
            confirmed: false,
            settled: false,
        }
    }

    fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// Swap the provisional message for the confirmed one.
    fn confirm(&mut self, confirmed: Message) -> Result<(), ChatError> {
        let mut store = lock_store(&self.store);
        let confirmed_id = confirmed.id.clone();
        let temp_id = self.slot.take();

        if store.contains_message(&self.chat_id, &confirmed_id) {
            // A transcript reload already delivered it.
            if let Some(temp_id) = temp_id {
                if let Err(e) = store.remove_message(&self.chat_id, &temp_id) {
                    debug!(chat_id = %self.chat_id, error = %e, "Provisional message already gone");
                }
            }
            self.confirmed = true;
            return Ok(());
        }

        let replaced = match temp_id {
            Some(temp_id) => store.replace_message(&self.chat_id, &temp_id, confirmed.clone()),
            None => Err(ChatError::MessageNotFound {
                chat_id: self.chat_id.clone(),
                message_id: confirmed_id.clone(),
            }),
        };
        match replaced {
            Ok(()) => {}
            Err(ChatError::MessageNotFound { message_id, .. }) => {
                warn!(
                    chat_id = %self.chat_id,
                    message_id = %message_id,
                    "Provisional message lost, appending confirmed message"
                );
                store.append_message(&self.chat_id, confirmed)?;
            }
            Err(e) => return Err(e),
        }
        self.slot = Some(confirmed_id);
        self.confirmed = true;
        Ok(())
    }

    fn attach_reply(&mut self, reply: Message) -> Result<(), ChatError> {
        let mut store = lock_store(&self.store);
        if store.contains_message(&self.chat_id, &reply.id) {
            return Ok(());
        }
        store.append_message(&self.chat_id, reply)
    }

    fn settle(&mut self) {
        self.settled = true;
        lock_store(&self.store).end_send(&self.chat_id);
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut store = lock_store(&self.store);
        if let Some(id) = self.slot.take() {
            match store.remove_message(&self.chat_id, &id) {
                Ok(_) => debug!(chat_id = %self.chat_id, message_id = %id, "Rolled back send"),
                Err(e) => debug!(chat_id = %self.chat_id, error = %e, "Nothing to roll back"),
            }
        }
        store.end_send(&self.chat_id);
    }
}

// =============================================================================
// Tests
// =============================================================================
