//! Two-step delete confirmation.
//!
//! The first delete request arms the confirmation for that chat; a second
//! request for the same chat before the deadline confirms it. Expiry is
//! checked against the `now` the caller passes in, so no timer is needed.
//!
//! Transitions:
//! Idle -> PendingConfirm (request)
//! PendingConfirm -> Idle (confirm, cancel, expiry)
//! PendingConfirm -> PendingConfirm (request for another chat re-arms)

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use colloquy_core::ChatId;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum DeleteConfirmation {
    #[default]
    Idle,
    PendingConfirm {
        chat_id: ChatId,
        expires_at: DateTime<Utc>,
    },
}

/// What a delete request resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// First request: ask the user to repeat it before the deadline.
    AwaitingConfirmation { expires_at: DateTime<Utc> },
    /// Second request in time: go ahead and delete.
    Confirmed(ChatId),
}

impl DeleteConfirmation {
    /// Handle a delete request for `chat_id` at time `now`.
    pub fn request(&mut self, chat_id: &ChatId, now: DateTime<Utc>, window: Duration) -> ConfirmOutcome {
        self.expire(now);

        if let DeleteConfirmation::PendingConfirm { chat_id: pending, .. } = self {
            if *pending == *chat_id {
                debug!(chat_id = %chat_id, "Delete confirmed");
                *self = DeleteConfirmation::Idle;
                return ConfirmOutcome::Confirmed(chat_id.clone());
            }
        }

        let expires_at = now + window;
        debug!(chat_id = %chat_id, %expires_at, "Delete awaiting confirmation");
        *self = DeleteConfirmation::PendingConfirm {
            chat_id: chat_id.clone(),
            expires_at,
        };
        ConfirmOutcome::AwaitingConfirmation { expires_at }
    }

    /// Drop back to `Idle` once the deadline has passed.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        if let DeleteConfirmation::PendingConfirm { expires_at, .. } = self {
            if now >= *expires_at {
                *self = DeleteConfirmation::Idle;
            }
        }
    }

    pub fn cancel(&mut self) {
        *self = DeleteConfirmation::Idle;
    }

    /// Chat awaiting confirmation at `now`, if any.
    pub fn pending_for(&self, now: DateTime<Utc>) -> Option<&ChatId> {
        match self {
            DeleteConfirmation::PendingConfirm { chat_id, expires_at } if now < *expires_at => {
                Some(chat_id)
            }
            _ => None,
        }
    }
}
