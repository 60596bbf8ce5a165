//! End-to-end send flow through the public API: store, reconciler,
//! scripted remote service and the transcript scroll controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use colloquy_chat::{lock_store, ChatError, ConversationService, Reconciler, SessionStore};
use colloquy_core::config::ChatConfig;
use colloquy_core::{Chat, ChatId, ChatTranscript, Message, MessageId, Role, StoreEvent};
use colloquy_ui::{FollowMode, ScrollController};

/// Remote that hands out fixed ids: the chat is `c1`, each exchange is
/// `m<n>` (user) and `m<n+1>` (assistant).
struct ScriptedService {
    transcript: Mutex<Vec<Message>>,
    fail: AtomicBool,
}

impl ScriptedService {
    fn new() -> Self {
        Self {
            transcript: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), ChatError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(ChatError::NetworkFailure("503 Service Unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn created_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 8, 0, 0).unwrap()
}

#[async_trait]
impl ConversationService for ScriptedService {
    async fn list_chats(&self) -> Result<Vec<Chat>, ChatError> {
        self.check()?;
        Ok(vec![Chat::new("c1", "Scripted", created_at())])
    }

    async fn get_chat(&self, chat_id: &ChatId) -> Result<ChatTranscript, ChatError> {
        self.check()?;
        Ok(ChatTranscript {
            chat: Chat::new(chat_id.as_str(), "Scripted", created_at()),
            messages: self.transcript.lock().unwrap().clone(),
        })
    }

    async fn create_chat(&self, name: &str) -> Result<Chat, ChatError> {
        self.check()?;
        Ok(Chat::new("c1", name, created_at()))
    }

    async fn delete_chat(&self, _chat_id: &ChatId) -> Result<(), ChatError> {
        self.check()
    }

    async fn submit_message(&self, _chat_id: &ChatId, content: &str) -> Result<Message, ChatError> {
        self.check()?;
        let mut transcript = self.transcript.lock().unwrap();
        let n = transcript.len() + 1;
        let user = Message::new(format!("m{n}"), Role::User, content, Utc::now());
        let reply = Message::new(
            format!("m{}", n + 1),
            Role::Assistant,
            format!("Echo: {content}"),
            Utc::now(),
        );
        transcript.push(user.clone());
        transcript.push(reply);
        Ok(user)
    }

    async fn list_messages(&self, _chat_id: &ChatId) -> Result<Vec<Message>, ChatError> {
        self.check()?;
        Ok(self.transcript.lock().unwrap().clone())
    }
}

/// Feed store events for the active chat into the scroll controller, the
/// way a front end would.
fn drain_into(
    rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>,
    scroll: &mut ScrollController,
    active: &ChatId,
) {
    while let Ok(event) = rx.try_recv() {
        if let StoreEvent::MessageAppended { chat_id, .. } = &event {
            if chat_id == active {
                scroll.on_message_appended();
            }
        }
    }
}

#[tokio::test]
async fn test_e2e_create_then_send() {
    let store = SessionStore::shared();
    let service = Arc::new(ScriptedService::new());
    let rec = Reconciler::new(store.clone(), service, ChatConfig::default());
    let mut scroll = ScrollController::default();
    let mut rx = lock_store(&store).subscribe();

    assert!(lock_store(&store).list_chats().is_empty());

    let chat = rec.create_chat("Greetings").await.unwrap();
    let selected_before = lock_store(&store).current_chat_id().cloned();
    assert_eq!(selected_before, Some(chat.id.clone()));

    let outcome = rec.send(Some(chat.id.clone()), "Hello").await.unwrap();
    drain_into(&mut rx, &mut scroll, &chat.id);

    let store = lock_store(&store);
    let ids: Vec<&MessageId> = store.messages(&chat.id).unwrap().iter().map(|m| &m.id).collect();
    assert_eq!(ids, vec![&MessageId::new("m1"), &MessageId::new("m2")]);
    assert_eq!(outcome.user.content, "Hello");
    assert_eq!(outcome.reply.role, Role::Assistant);
    assert_eq!(store.current_chat_id().cloned(), selected_before);

    assert_eq!(scroll.mode(), FollowMode::Following);
    assert!(scroll.state().auto_follow);
    assert!(scroll.apply_pending_scroll());
}

#[tokio::test]
async fn test_e2e_failed_send_is_bit_identical() {
    let store = SessionStore::shared();
    let service = Arc::new(ScriptedService::new());
    let rec = Reconciler::new(store.clone(), service.clone(), ChatConfig::default());

    let chat = rec.create_chat("Greetings").await.unwrap();
    rec.send(Some(chat.id.clone()), "one").await.unwrap();
    rec.send(Some(chat.id.clone()), "two").await.unwrap();
    let before = lock_store(&store).messages(&chat.id).unwrap().to_vec();
    assert_eq!(before.len(), 4);

    service.fail.store(true, Ordering::SeqCst);
    let err = rec.send(Some(chat.id.clone()), "three").await.unwrap_err();
    assert!(err.is_user_visible());

    assert_eq!(lock_store(&store).messages(&chat.id).unwrap(), &before[..]);

    // The user resends once the service is back.
    service.fail.store(false, Ordering::SeqCst);
    let outcome = rec.send(Some(chat.id.clone()), "three").await.unwrap();
    let after = lock_store(&store).messages(&chat.id).unwrap().to_vec();
    assert_eq!(after.len(), 6);
    assert_eq!(after[4], outcome.user);
    assert_eq!(after[5], outcome.reply);
}

#[tokio::test]
async fn test_e2e_pinned_view_stays_put() {
    let store = SessionStore::shared();
    let rec = Reconciler::new(
        store.clone(),
        Arc::new(ScriptedService::new()),
        ChatConfig::default(),
    );
    let mut scroll = ScrollController::default();
    let chat = rec.create_chat("Long").await.unwrap();
    let mut rx = lock_store(&store).subscribe();

    scroll.on_scroll(640.0);
    rec.send(Some(chat.id.clone()), "while reading history").await.unwrap();
    drain_into(&mut rx, &mut scroll, &chat.id);

    assert!(!scroll.apply_pending_scroll());
    assert!(scroll.shows_jump_affordance());

    scroll.jump_to_latest();
    assert!(scroll.apply_pending_scroll());
    assert!(scroll.state().auto_follow);
}
