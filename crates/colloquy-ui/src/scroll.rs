//! Transcript follow behaviour.
//!
//! The controller starts out `Following`. Scrolling further than the
//! threshold from the bottom pins the view and shows a "jump to latest"
//! affordance; scrolling back within the threshold resumes following.
//! Appends only pull the view down while following.

use tracing::trace;

/// Distance from the bottom beyond which the view counts as pinned.
pub const DEFAULT_FOLLOW_THRESHOLD: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FollowMode {
    #[default]
    Following,
    Pinned,
}

/// Snapshot exposed to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollState {
    pub auto_follow: bool,
    /// A scroll to the bottom was requested and not yet applied.
    pub pending_jump: bool,
}

pub struct ScrollController {
    mode: FollowMode,
    pending_jump: bool,
    threshold: f64,
}

impl ScrollController {
    pub fn new(threshold: f64) -> Self {
        Self {
            mode: FollowMode::Following,
            pending_jump: false,
            threshold,
        }
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn state(&self) -> ScrollState {
        ScrollState {
            auto_follow: self.mode == FollowMode::Following,
            pending_jump: self.pending_jump,
        }
    }

    /// Whether the "jump to latest" affordance should be shown.
    pub fn shows_jump_affordance(&self) -> bool {
        self.mode == FollowMode::Pinned
    }

    /// Record a scroll event, given the distance left to the bottom.
    pub fn on_scroll(&mut self, distance_from_bottom: f64) {
        let next = if distance_from_bottom > self.threshold {
            FollowMode::Pinned
        } else {
            FollowMode::Following
        };
        if next != self.mode {
            trace!(distance = distance_from_bottom, mode = ?next, "Follow mode changed");
        }
        if next == FollowMode::Pinned {
            // The user scrolled away before the jump was applied.
            self.pending_jump = false;
        }
        self.mode = next;
    }

    /// A message was appended to the active transcript. Returns whether a
    /// scroll to the bottom was requested.
    pub fn on_message_appended(&mut self) -> bool {
        if self.mode == FollowMode::Pinned {
            return false;
        }
        self.pending_jump = true;
        true
    }

    /// Explicit "jump to latest".
    pub fn jump_to_latest(&mut self) {
        self.mode = FollowMode::Following;
        self.pending_jump = true;
    }

    /// The active chat changed; a fresh transcript starts at the bottom.
    pub fn reset(&mut self) {
        self.jump_to_latest();
    }

    /// Consume a pending scroll request. Returns true when the caller
    /// should scroll to the bottom now.
    pub fn apply_pending_scroll(&mut self) -> bool {
        std::mem::take(&mut self.pending_jump)
    }
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_THRESHOLD)
    }
}
