use serde::{Deserialize, Serialize};

use crate::types::{ChatId, MessageId};

/// Change notifications published by the session store.
///
/// Exactly one event is emitted per successful mutation, after the
/// mutation is fully applied, so observers never see a half-applied
/// state. Consumers re-read the store snapshot they care about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    /// The chat list was replaced by a fresh snapshot from the remote.
    ChatsReplaced { count: usize },

    ChatCreated { chat_id: ChatId },

    /// A chat and its transcript were removed. `selected` is the new
    /// selection after reassignment.
    ChatDeleted {
        chat_id: ChatId,
        selected: Option<ChatId>,
    },

    ChatSelected { chat_id: Option<ChatId> },

    /// A chat's transcript was replaced by the remote copy.
    TranscriptLoaded { chat_id: ChatId, count: usize },

    MessageAppended {
        chat_id: ChatId,
        message_id: MessageId,
    },

    /// A message was swapped in place, e.g. provisional -> confirmed.
    MessageReplaced {
        chat_id: ChatId,
        old_id: MessageId,
        new_id: MessageId,
    },

    MessageRemoved {
        chat_id: ChatId,
        message_id: MessageId,
    },
}

impl StoreEvent {
    /// The chat this event concerns, if it targets a single chat.
    pub fn chat_id(&self) -> Option<&ChatId> {
        match self {
            StoreEvent::ChatsReplaced { .. } => None,
            StoreEvent::ChatSelected { chat_id } => chat_id.as_ref(),
            StoreEvent::ChatCreated { chat_id }
            | StoreEvent::ChatDeleted { chat_id, .. }
            | StoreEvent::TranscriptLoaded { chat_id, .. }
            | StoreEvent::MessageAppended { chat_id, .. }
            | StoreEvent::MessageReplaced { chat_id, .. }
            | StoreEvent::MessageRemoved { chat_id, .. } => Some(chat_id),
        }
    }

    /// Short event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            StoreEvent::ChatsReplaced { .. } => "chats_replaced",
            StoreEvent::ChatCreated { .. } => "chat_created",
            StoreEvent::ChatDeleted { .. } => "chat_deleted",
            StoreEvent::ChatSelected { .. } => "chat_selected",
            StoreEvent::TranscriptLoaded { .. } => "transcript_loaded",
            StoreEvent::MessageAppended { .. } => "message_appended",
            StoreEvent::MessageReplaced { .. } => "message_replaced",
            StoreEvent::MessageRemoved { .. } => "message_removed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_chat_id() {
        let ev = StoreEvent::MessageAppended {
            chat_id: ChatId::new("c1"),
            message_id: MessageId::new("m1"),
        };
        assert_eq!(ev.chat_id(), Some(&ChatId::new("c1")));
        assert!(StoreEvent::ChatsReplaced { count: 3 }.chat_id().is_none());
        assert!(StoreEvent::ChatSelected { chat_id: None }.chat_id().is_none());
    }

    #[test]
    fn test_event_names_match_serde_tags() {
        let events = vec![
            StoreEvent::ChatsReplaced { count: 0 },
            StoreEvent::ChatCreated {
                chat_id: ChatId::new("c"),
            },
            StoreEvent::ChatDeleted {
                chat_id: ChatId::new("c"),
                selected: None,
            },
            StoreEvent::ChatSelected { chat_id: None },
            StoreEvent::TranscriptLoaded {
                chat_id: ChatId::new("c"),
                count: 0,
            },
            StoreEvent::MessageAppended {
                chat_id: ChatId::new("c"),
                message_id: MessageId::new("m"),
            },
            StoreEvent::MessageReplaced {
                chat_id: ChatId::new("c"),
                old_id: MessageId::new("a"),
                new_id: MessageId::new("b"),
            },
            StoreEvent::MessageRemoved {
                chat_id: ChatId::new("c"),
                message_id: MessageId::new("m"),
            },
        ];

        for ev in events {
            let json = serde_json::to_value(&ev).unwrap();
            assert_eq!(json["event"], ev.event_name());
        }
    }
}
