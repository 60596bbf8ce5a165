//! Client-side session store.
//!
//! Single source of truth for the chat list, the current selection and
//! per-chat transcripts. Every mutating operation is applied in full
//! before its [`StoreEvent`] is published, so observers never see a
//! half-applied change.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use colloquy_core::{Chat, ChatId, Message, MessageId, StoreEvent};

use crate::error::ChatError;

/// Capacity of the observer channel. Slow observers that fall further
/// behind see `RecvError::Lagged` and should re-read the store.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Store shared between the presentation layer and in-flight sends.
///
/// The lock is only ever held for a single store operation, never across
/// an await point.
pub type SharedStore = Arc<Mutex<SessionStore>>;

/// Lock a shared store.
///
/// Every store operation leaves the store consistent before it can
/// panic, so a poisoned lock is recovered rather than propagated.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, SessionStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory model of chats and their transcripts.
pub struct SessionStore {
    /// Most recently created first; unique by id.
    chats: Vec<Chat>,
    /// Always refers to an entry of `chats` when set.
    current_chat_id: Option<ChatId>,
    /// Chronological transcript per chat, in conversational order.
    messages_by_chat: HashMap<ChatId, Vec<Message>>,
    /// Chats with a send in flight. At most one per chat.
    sending: HashSet<ChatId>,
    /// Ids of optimistic messages not yet confirmed by the remote.
    provisional: HashSet<MessageId>,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl SessionStore {
    /// Create an empty store: no chats, no selection.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            chats: Vec::new(),
            current_chat_id: None,
            messages_by_chat: HashMap::new(),
            sending: HashSet::new(),
            provisional: HashSet::new(),
            event_tx,
        }
    }

    /// Wrap a fresh store for sharing.
    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Snapshot of the chat list, newest first.
    pub fn list_chats(&self) -> Vec<Chat> {
        self.chats.clone()
    }

    pub fn chat(&self, chat_id: &ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.id == chat_id)
    }

    pub fn contains_chat(&self, chat_id: &ChatId) -> bool {
        self.chat(chat_id).is_some()
    }

    pub fn current_chat_id(&self) -> Option<&ChatId> {
        self.current_chat_id.as_ref()
    }

    pub fn current_chat(&self) -> Option<&Chat> {
        self.current_chat_id.as_ref().and_then(|id| self.chat(id))
    }

    /// Transcript of a chat, or `None` if the chat is unknown.
    pub fn messages(&self, chat_id: &ChatId) -> Option<&[Message]> {
        self.messages_by_chat.get(chat_id).map(Vec::as_slice)
    }

    /// Transcript of the selected chat; empty when nothing is selected.
    pub fn current_messages(&self) -> &[Message] {
        self.current_chat_id
            .as_ref()
            .and_then(|id| self.messages(id))
            .unwrap_or(&[])
    }

    pub fn contains_message(&self, chat_id: &ChatId, message_id: &MessageId) -> bool {
        self.messages(chat_id)
            .is_some_and(|msgs| msgs.iter().any(|m| &m.id == message_id))
    }

    pub fn is_sending(&self, chat_id: &ChatId) -> bool {
        self.sending.contains(chat_id)
    }

    /// Whether a message was inserted optimistically and is still
    /// awaiting confirmation.
    pub fn is_provisional(&self, message_id: &MessageId) -> bool {
        self.provisional.contains(message_id)
    }

    // -------------------------------------------------------------------------
    // Chat list
    // -------------------------------------------------------------------------

    /// Select a chat. Unknown ids leave the selection unchanged.
    pub fn select_chat(&mut self, chat_id: &ChatId) -> Result<(), ChatError> {
        if !self.contains_chat(chat_id) {
            warn!(chat_id = %chat_id, "Cannot select unknown chat");
            return Err(ChatError::UnknownChat(chat_id.clone()));
        }
        self.current_chat_id = Some(chat_id.clone());
        self.emit(StoreEvent::ChatSelected {
            chat_id: Some(chat_id.clone()),
        });
        Ok(())
    }

    /// Insert a chat at the front of the list with an empty transcript.
    ///
    /// A chat whose id is already present is left as is and the stored
    /// entry is returned.
    pub fn create_chat(&mut self, chat: Chat) -> Chat {
        if let Some(existing) = self.chat(&chat.id) {
            debug!(chat_id = %chat.id, "Chat already present, keeping stored entry");
            return existing.clone();
        }
        self.messages_by_chat.insert(chat.id.clone(), Vec::new());
        self.chats.insert(0, chat.clone());
        self.emit(StoreEvent::ChatCreated {
            chat_id: chat.id.clone(),
        });
        chat
    }

    /// Remove a chat and its transcript together.
    ///
    /// Deleting the selected chat moves the selection to the new front of
    /// the list, or clears it when no chats remain. Returns the selection
    /// after the delete.
    pub fn delete_chat(&mut self, chat_id: &ChatId) -> Result<Option<ChatId>, ChatError> {
        let Some(pos) = self.chats.iter().position(|c| &c.id == chat_id) else {
            warn!(chat_id = %chat_id, "Cannot delete unknown chat");
            return Err(ChatError::UnknownChat(chat_id.clone()));
        };

        self.chats.remove(pos);
        if let Some(messages) = self.messages_by_chat.remove(chat_id) {
            self.forget_provisional(&messages);
        }
        self.sending.remove(chat_id);
        if self.current_chat_id.as_ref() == Some(chat_id) {
            self.current_chat_id = self.chats.first().map(|c| c.id.clone());
        }

        self.emit(StoreEvent::ChatDeleted {
            chat_id: chat_id.clone(),
            selected: self.current_chat_id.clone(),
        });
        Ok(self.current_chat_id.clone())
    }

    /// Replace the chat list with a snapshot from the remote service.
    ///
    /// Duplicates are dropped (first wins) and the list is ordered newest
    /// first. Transcripts of surviving chats are kept. The selection is
    /// kept when its chat survives, otherwise it moves to the front.
    pub fn replace_chats(&mut self, chats: Vec<Chat>) {
        let mut seen = HashSet::new();
        let mut chats: Vec<Chat> = chats
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let dropped: Vec<ChatId> = self
            .messages_by_chat
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in dropped {
            if let Some(messages) = self.messages_by_chat.remove(&id) {
                self.forget_provisional(&messages);
            }
        }
        self.sending.retain(|id| seen.contains(id));
        for chat in &chats {
            self.messages_by_chat.entry(chat.id.clone()).or_default();
        }

        let selection_survives = self
            .current_chat_id
            .as_ref()
            .is_some_and(|id| seen.contains(id));
        if !selection_survives && self.current_chat_id.is_some() {
            self.current_chat_id = chats.first().map(|c| c.id.clone());
        }

        self.chats = chats;
        self.emit(StoreEvent::ChatsReplaced {
            count: self.chats.len(),
        });
    }

    // -------------------------------------------------------------------------
    // Transcripts
    // -------------------------------------------------------------------------

    /// Append a message to the end of a chat's transcript.
    pub fn append_message(&mut self, chat_id: &ChatId, message: Message) -> Result<(), ChatError> {
        let bucket = self.bucket_mut(chat_id)?;
        let message_id = message.id.clone();
        bucket.push(message);
        self.emit(StoreEvent::MessageAppended {
            chat_id: chat_id.clone(),
            message_id,
        });
        Ok(())
    }

    /// Append a locally minted message that awaits confirmation. It stays
    /// provisional until it is replaced or removed.
    pub fn append_provisional(&mut self, chat_id: &ChatId, message: Message) -> Result<(), ChatError> {
        let message_id = message.id.clone();
        self.append_message(chat_id, message)?;
        self.provisional.insert(message_id);
        Ok(())
    }

    /// Swap the message `old_id` for `confirmed`, keeping its position.
    pub fn replace_message(
        &mut self,
        chat_id: &ChatId,
        old_id: &MessageId,
        confirmed: Message,
    ) -> Result<(), ChatError> {
        let bucket = self.bucket_mut(chat_id)?;
        let Some(slot) = bucket.iter_mut().find(|m| &m.id == old_id) else {
            warn!(chat_id = %chat_id, message_id = %old_id, "Reconciliation target missing");
            return Err(ChatError::MessageNotFound {
                chat_id: chat_id.clone(),
                message_id: old_id.clone(),
            });
        };
        let new_id = confirmed.id.clone();
        *slot = confirmed;
        self.provisional.remove(old_id);
        self.emit(StoreEvent::MessageReplaced {
            chat_id: chat_id.clone(),
            old_id: old_id.clone(),
            new_id,
        });
        Ok(())
    }

    /// Remove a single message, returning it.
    pub fn remove_message(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
    ) -> Result<Message, ChatError> {
        let bucket = self.bucket_mut(chat_id)?;
        let Some(pos) = bucket.iter().position(|m| &m.id == message_id) else {
            return Err(ChatError::MessageNotFound {
                chat_id: chat_id.clone(),
                message_id: message_id.clone(),
            });
        };
        let removed = bucket.remove(pos);
        self.provisional.remove(message_id);
        self.emit(StoreEvent::MessageRemoved {
            chat_id: chat_id.clone(),
            message_id: message_id.clone(),
        });
        Ok(removed)
    }

    /// Replace a chat's transcript with the remote copy.
    ///
    /// Provisional messages still awaiting confirmation are carried over
    /// at the end so an in-flight send can still reconcile them.
    pub fn set_transcript(
        &mut self,
        chat_id: &ChatId,
        messages: Vec<Message>,
    ) -> Result<(), ChatError> {
        let Some(bucket) = self.messages_by_chat.get_mut(chat_id) else {
            warn!(chat_id = %chat_id, "Operation on unknown chat");
            return Err(ChatError::UnknownChat(chat_id.clone()));
        };
        let pending: Vec<Message> = bucket
            .drain(..)
            .filter(|m| self.provisional.contains(&m.id))
            .collect();
        *bucket = messages;
        bucket.extend(pending);
        let count = bucket.len();
        self.emit(StoreEvent::TranscriptLoaded {
            chat_id: chat_id.clone(),
            count,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Send serialisation
    // -------------------------------------------------------------------------

    /// Mark a chat as having a send in flight.
    pub fn begin_send(&mut self, chat_id: &ChatId) -> Result<(), ChatError> {
        if !self.contains_chat(chat_id) {
            return Err(ChatError::UnknownChat(chat_id.clone()));
        }
        if !self.sending.insert(chat_id.clone()) {
            return Err(ChatError::SendInFlight(chat_id.clone()));
        }
        Ok(())
    }

    /// Clear the in-flight mark. Unknown chats are ignored.
    pub fn end_send(&mut self, chat_id: &ChatId) {
        self.sending.remove(chat_id);
    }

    // -- Private helpers --

    fn forget_provisional(&mut self, messages: &[Message]) {
        for message in messages {
            self.provisional.remove(&message.id);
        }
    }

    fn bucket_mut(&mut self, chat_id: &ChatId) -> Result<&mut Vec<Message>, ChatError> {
        self.messages_by_chat.get_mut(chat_id).ok_or_else(|| {
            warn!(chat_id = %chat_id, "Operation on unknown chat");
            ChatError::UnknownChat(chat_id.clone())
        })
    }

    fn emit(&self, event: StoreEvent) {
        debug!(event = event.event_name(), "Store changed");
        // No subscribers is not an error.
        let _ = self.event_tx.send(event);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use colloquy_core::Role;

    fn chat(id: &str, minute: u32) -> Chat {
        Chat::new(
            id,
            format!("Chat {id}"),
            Utc.with_ymd_and_hms(2025, 1, 1, 10, minute, 0).unwrap(),
        )
    }

    fn msg(id: &str, role: Role) -> Message {
        Message::new(id, role, format!("content {id}"), Utc::now())
    }

    fn store_with(ids: &[&str]) -> SessionStore {
        let mut store = SessionStore::new();
        for (i, id) in ids.iter().enumerate() {
            store.create_chat(chat(id, i as u32));
        }
        store
    }

    fn cid(id: &str) -> ChatId {
        ChatId::new(id)
    }

    // ---- Construction ----

    #[test]
    fn test_new_store_is_empty() {
        let store = SessionStore::new();
        assert!(store.list_chats().is_empty());
        assert!(store.current_chat_id().is_none());
        assert!(store.current_messages().is_empty());
    }

    // ---- create_chat ----

    #[test]
    fn test_create_chat_inserts_at_front() {
        let store = store_with(&["a", "b", "c"]);
        let ids: Vec<_> = store.list_chats().into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_create_chat_creates_empty_bucket() {
        let store = store_with(&["a"]);
        assert_eq!(store.messages(&cid("a")), Some(&[][..]));
    }

    #[test]
    fn test_create_chat_returns_stored_chat() {
        let mut store = SessionStore::new();
        let created = store.create_chat(chat("a", 0));
        assert_eq!(created, chat("a", 0));
    }

    #[test]
    fn test_create_duplicate_chat_keeps_existing() {
        let mut store = store_with(&["a"]);
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        let mut renamed = chat("a", 5);
        renamed.name = "Other".to_string();
        let stored = store.create_chat(renamed);
        assert_eq!(stored.name, "Chat a");
        assert_eq!(store.list_chats().len(), 1);
        assert_eq!(store.messages(&cid("a")).unwrap().len(), 1);
    }

    #[test]
    fn test_create_chat_does_not_select() {
        let store = store_with(&["a"]);
        assert!(store.current_chat_id().is_none());
    }

    // ---- select_chat ----

    #[test]
    fn test_select_existing_chat() {
        let mut store = store_with(&["a", "b"]);
        store.select_chat(&cid("a")).unwrap();
        assert_eq!(store.current_chat_id(), Some(&cid("a")));
        assert_eq!(store.current_chat().unwrap().name, "Chat a");
    }

    #[test]
    fn test_select_unknown_chat_leaves_state() {
        let mut store = store_with(&["a"]);
        store.select_chat(&cid("a")).unwrap();
        let err = store.select_chat(&cid("zzz")).unwrap_err();
        assert_eq!(err, ChatError::UnknownChat(cid("zzz")));
        assert_eq!(store.current_chat_id(), Some(&cid("a")));
    }

    // ---- delete_chat ----

    #[test]
    fn test_delete_selected_chat_selects_new_front() {
        let mut store = store_with(&["a", "b", "c"]);
        store.select_chat(&cid("c")).unwrap();
        let selected = store.delete_chat(&cid("c")).unwrap();
        assert_eq!(selected, Some(cid("b")));
        assert_eq!(store.current_chat_id(), Some(&cid("b")));
    }

    #[test]
    fn test_delete_selected_middle_chat_selects_front() {
        let mut store = store_with(&["a", "b", "c"]);
        store.select_chat(&cid("b")).unwrap();
        store.delete_chat(&cid("b")).unwrap();
        assert_eq!(store.current_chat_id(), Some(&cid("c")));
    }

    #[test]
    fn test_delete_last_chat_clears_selection() {
        let mut store = store_with(&["a"]);
        store.select_chat(&cid("a")).unwrap();
        assert_eq!(store.delete_chat(&cid("a")).unwrap(), None);
        assert!(store.current_chat_id().is_none());
        assert!(store.list_chats().is_empty());
    }

    #[test]
    fn test_delete_unselected_chat_keeps_selection() {
        let mut store = store_with(&["a", "b"]);
        store.select_chat(&cid("a")).unwrap();
        store.delete_chat(&cid("b")).unwrap();
        assert_eq!(store.current_chat_id(), Some(&cid("a")));
    }

    #[test]
    fn test_delete_removes_bucket() {
        let mut store = store_with(&["a"]);
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        store.delete_chat(&cid("a")).unwrap();
        assert!(store.messages(&cid("a")).is_none());
    }

    #[test]
    fn test_delete_unknown_chat() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            store.delete_chat(&cid("x")),
            Err(ChatError::UnknownChat(_))
        ));
        assert_eq!(store.list_chats().len(), 1);
    }

    #[test]
    fn test_delete_clears_in_flight_mark() {
        let mut store = store_with(&["a"]);
        store.begin_send(&cid("a")).unwrap();
        store.delete_chat(&cid("a")).unwrap();
        assert!(!store.is_sending(&cid("a")));
    }

    // ---- append / replace / remove ----

    #[test]
    fn test_append_preserves_order() {
        let mut store = store_with(&["a"]);
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        store.append_message(&cid("a"), msg("m2", Role::Assistant)).unwrap();
        let ids: Vec<_> = store.messages(&cid("a")).unwrap().iter().map(|m| m.id.0.clone()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_append_unknown_chat() {
        let mut store = SessionStore::new();
        let err = store.append_message(&cid("x"), msg("m1", Role::User)).unwrap_err();
        assert_eq!(err, ChatError::UnknownChat(cid("x")));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = store_with(&["a"]);
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        store.append_message(&cid("a"), msg("tmp-x", Role::User)).unwrap();
        store.append_message(&cid("a"), msg("m3", Role::Assistant)).unwrap();

        store
            .replace_message(&cid("a"), &MessageId::new("tmp-x"), msg("m2", Role::User))
            .unwrap();

        let ids: Vec<_> = store.messages(&cid("a")).unwrap().iter().map(|m| m.id.0.clone()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_replace_missing_message() {
        let mut store = store_with(&["a"]);
        let err = store
            .replace_message(&cid("a"), &MessageId::new("tmp-gone"), msg("m1", Role::User))
            .unwrap_err();
        assert!(matches!(err, ChatError::MessageNotFound { .. }));
        assert!(store.messages(&cid("a")).unwrap().is_empty());
    }

    #[test]
    fn test_replace_unknown_chat() {
        let mut store = SessionStore::new();
        let err = store
            .replace_message(&cid("x"), &MessageId::new("tmp"), msg("m1", Role::User))
            .unwrap_err();
        assert_eq!(err, ChatError::UnknownChat(cid("x")));
    }

    #[test]
    fn test_remove_message() {
        let mut store = store_with(&["a"]);
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        let removed = store.remove_message(&cid("a"), &MessageId::new("m1")).unwrap();
        assert_eq!(removed.id, MessageId::new("m1"));
        assert!(store.messages(&cid("a")).unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_message() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            store.remove_message(&cid("a"), &MessageId::new("nope")),
            Err(ChatError::MessageNotFound { .. })
        ));
    }

    #[test]
    fn test_current_messages_follows_selection() {
        let mut store = store_with(&["a", "b"]);
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        store.select_chat(&cid("b")).unwrap();
        assert!(store.current_messages().is_empty());
        store.select_chat(&cid("a")).unwrap();
        assert_eq!(store.current_messages().len(), 1);
    }

    // ---- replace_chats ----

    #[test]
    fn test_replace_chats_sorts_newest_first_and_dedupes() {
        let mut store = SessionStore::new();
        store.replace_chats(vec![chat("old", 1), chat("new", 9), chat("old", 3), chat("mid", 5)]);
        let ids: Vec<_> = store.list_chats().into_iter().map(|c| c.id.0).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_replace_chats_keeps_surviving_selection_and_transcript() {
        let mut store = store_with(&["a", "b"]);
        store.select_chat(&cid("a")).unwrap();
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();

        store.replace_chats(vec![chat("a", 0), chat("c", 7)]);

        assert_eq!(store.current_chat_id(), Some(&cid("a")));
        assert_eq!(store.messages(&cid("a")).unwrap().len(), 1);
        assert!(store.messages(&cid("b")).is_none());
        assert_eq!(store.messages(&cid("c")), Some(&[][..]));
    }

    #[test]
    fn test_replace_chats_reassigns_vanished_selection() {
        let mut store = store_with(&["a", "b"]);
        store.select_chat(&cid("a")).unwrap();
        store.replace_chats(vec![chat("x", 2), chat("y", 8)]);
        assert_eq!(store.current_chat_id(), Some(&cid("y")));

        store.replace_chats(vec![]);
        assert!(store.current_chat_id().is_none());
    }

    #[test]
    fn test_replace_chats_without_selection_selects_nothing() {
        let mut store = SessionStore::new();
        store.replace_chats(vec![chat("x", 2)]);
        assert!(store.current_chat_id().is_none());
    }

    // ---- set_transcript ----

    #[test]
    fn test_set_transcript_replaces_messages() {
        let mut store = store_with(&["a"]);
        store.append_message(&cid("a"), msg("stale", Role::User)).unwrap();
        store
            .set_transcript(&cid("a"), vec![msg("m1", Role::User), msg("m2", Role::Assistant)])
            .unwrap();
        let ids: Vec<_> = store.messages(&cid("a")).unwrap().iter().map(|m| m.id.0.clone()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_set_transcript_keeps_provisional_at_end() {
        let mut store = store_with(&["a"]);
        let provisional = Message::provisional_user("pending");
        let temp_id = provisional.id.clone();
        store.append_provisional(&cid("a"), provisional).unwrap();

        store.set_transcript(&cid("a"), vec![msg("m1", Role::User)]).unwrap();

        let msgs = store.messages(&cid("a")).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].id, temp_id);
        assert!(store.is_provisional(&temp_id));
    }

    #[test]
    fn test_set_transcript_does_not_duplicate_confirmed_tmp_like_id() {
        // Server ids are opaque; this one only looks like a local token.
        let mut store = store_with(&["a"]);
        let confirmed = msg("tmp-report", Role::Assistant);
        store.append_message(&cid("a"), confirmed.clone()).unwrap();
        assert!(!store.is_provisional(&confirmed.id));

        store.set_transcript(&cid("a"), vec![confirmed.clone()]).unwrap();

        assert_eq!(store.messages(&cid("a")).unwrap(), &[confirmed][..]);
    }

    #[test]
    fn test_provisional_mark_cleared_on_replace_and_remove() {
        let mut store = store_with(&["a"]);
        let first = Message::provisional_user("one");
        let second = Message::provisional_user("two");
        store.append_provisional(&cid("a"), first.clone()).unwrap();
        store.append_provisional(&cid("a"), second.clone()).unwrap();

        store
            .replace_message(&cid("a"), &first.id, msg("m1", Role::User))
            .unwrap();
        store.remove_message(&cid("a"), &second.id).unwrap();

        assert!(!store.is_provisional(&first.id));
        assert!(!store.is_provisional(&second.id));
        assert!(!store.is_provisional(&MessageId::new("m1")));
    }

    #[test]
    fn test_delete_chat_forgets_provisional_messages() {
        let mut store = store_with(&["a", "b"]);
        let pending = Message::provisional_user("orphan");
        store.append_provisional(&cid("a"), pending.clone()).unwrap();

        store.delete_chat(&cid("a")).unwrap();

        assert!(!store.is_provisional(&pending.id));
    }

    #[test]
    fn test_set_transcript_unknown_chat() {
        let mut store = SessionStore::new();
        assert!(store.set_transcript(&cid("x"), vec![]).is_err());
    }

    // ---- Send serialisation ----

    #[test]
    fn test_begin_send_twice_fails() {
        let mut store = store_with(&["a", "b"]);
        store.begin_send(&cid("a")).unwrap();
        assert_eq!(
            store.begin_send(&cid("a")).unwrap_err(),
            ChatError::SendInFlight(cid("a"))
        );
        // Other chats are independent.
        assert!(store.begin_send(&cid("b")).is_ok());
        store.end_send(&cid("a"));
        assert!(store.begin_send(&cid("a")).is_ok());
    }

    #[test]
    fn test_begin_send_unknown_chat() {
        let mut store = SessionStore::new();
        assert!(matches!(
            store.begin_send(&cid("x")),
            Err(ChatError::UnknownChat(_))
        ));
    }

    // ---- Observers ----

    #[test]
    fn test_events_emitted_after_mutation() {
        let mut store = SessionStore::new();
        let mut rx = store.subscribe();

        store.create_chat(chat("a", 0));
        store.select_chat(&cid("a")).unwrap();
        store.append_message(&cid("a"), msg("m1", Role::User)).unwrap();
        store.delete_chat(&cid("a")).unwrap();

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::ChatCreated { chat_id: cid("a") });
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::ChatSelected { chat_id: Some(cid("a")) }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::MessageAppended {
                chat_id: cid("a"),
                message_id: MessageId::new("m1"),
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::ChatDeleted {
                chat_id: cid("a"),
                selected: None,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_operations_emit_nothing() {
        let mut store = SessionStore::new();
        let mut rx = store.subscribe();
        let _ = store.select_chat(&cid("x"));
        let _ = store.append_message(&cid("x"), msg("m1", Role::User));
        let _ = store.delete_chat(&cid("x"));
        assert!(rx.try_recv().is_err());
    }
}
