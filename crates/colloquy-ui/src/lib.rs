//! Presentation-side state machines for Colloquy transcripts.
//!
//! - [`scroll`]: whether new messages pull the view to the bottom
//! - [`confirm`]: two-step delete confirmation with expiry
//! - [`render`]: message to terminal lines, via content segmentation

pub mod confirm;
pub mod render;
pub mod scroll;

pub use confirm::{ConfirmOutcome, DeleteConfirmation};
pub use render::{render_message, render_transcript};
pub use scroll::{FollowMode, ScrollController, ScrollState, DEFAULT_FOLLOW_THRESHOLD};
