//! Chat-list synchronisation with the remote service.
//!
//! Each operation makes its remote call first and touches the store only
//! once the call succeeded, so a network failure leaves the store as it
//! was.

use tracing::{info, warn};

use colloquy_core::{Chat, ChatId, ChatTranscript};

use crate::error::ChatError;
use crate::reconciler::Reconciler;
use crate::store::lock_store;

impl Reconciler {
    /// Replace the local chat list with the remote one.
    pub async fn refresh_chats(&self) -> Result<Vec<Chat>, ChatError> {
        let chats = self.service.list_chats().await.inspect_err(|e| {
            warn!(error = %e, "Failed to refresh chat list");
        })?;
        let mut store = lock_store(&self.store);
        store.replace_chats(chats);
        info!(count = store.list_chats().len(), "Chat list refreshed");
        Ok(store.list_chats())
    }

    /// Select a chat and load its transcript from the remote.
    pub async fn open_chat(&self, chat_id: &ChatId) -> Result<ChatTranscript, ChatError> {
        if !lock_store(&self.store).contains_chat(chat_id) {
            warn!(chat_id = %chat_id, "Cannot open unknown chat");
            return Err(ChatError::UnknownChat(chat_id.clone()));
        }

        let transcript = self.service.get_chat(chat_id).await.inspect_err(|e| {
            warn!(chat_id = %chat_id, error = %e, "Failed to load transcript");
        })?;

        let mut store = lock_store(&self.store);
        store.set_transcript(chat_id, transcript.messages.clone())?;
        store.select_chat(chat_id)?;
        Ok(transcript)
    }

    /// Create a chat remotely, insert it at the front and select it.
    pub async fn create_chat(&self, name: &str) -> Result<Chat, ChatError> {
        let chat = self.service.create_chat(name).await.inspect_err(|e| {
            warn!(error = %e, "Failed to create chat");
        })?;
        let mut store = lock_store(&self.store);
        let chat = store.create_chat(chat);
        store.select_chat(&chat.id)?;
        info!(chat_id = %chat.id, name = %chat.name, "Chat created");
        Ok(chat)
    }

    /// Delete a chat remotely and locally. Returns the new selection.
    pub async fn delete_chat(&self, chat_id: &ChatId) -> Result<Option<ChatId>, ChatError> {
        if !lock_store(&self.store).contains_chat(chat_id) {
            return Err(ChatError::UnknownChat(chat_id.clone()));
        }
        self.service.delete_chat(chat_id).await.inspect_err(|e| {
            warn!(chat_id = %chat_id, error = %e, "Failed to delete chat");
        })?;
        let selected = lock_store(&self.store).delete_chat(chat_id)?;
        info!(chat_id = %chat_id, "Chat deleted");
        Ok(selected)
    }
}
