use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Identifiers
// =============================================================================

/// Prefix of locally minted message ids. Only the session store knows
/// which ids are still awaiting confirmation; a confirmed id may carry
/// the same prefix.
pub const PROVISIONAL_PREFIX: &str = "tmp-";

/// Opaque chat identifier assigned by the remote conversation service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque message identifier.
///
/// Confirmed ids come from the remote service. Provisional ids are minted
/// locally with [`MessageId::provisional`] and never leave the client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh temporary id for an optimistic insertion.
    pub fn provisional() -> Self {
        Self(format!("{}{}", PROVISIONAL_PREFIX, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Author of a message. Decides which side of the transcript it renders on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A named conversation container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(id: impl Into<String>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ChatId::new(id),
            name: name.into(),
            created_at,
        }
    }
}

/// One turn of a conversation.
///
/// Immutable once confirmed; a provisional message is replaced wholesale
/// by its confirmed counterpart rather than mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(id),
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// Build a provisional user message stamped with the current time.
    pub fn provisional_user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::provisional(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A chat together with its full transcript, as returned by
/// `GET /chats/{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTranscript {
    #[serde(flatten)]
    pub chat: Chat,
    #[serde(default)]
    pub messages: Vec<Message>,
}
