//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use colloquy_chat::{ConversationService, MemoryConversationService};
use colloquy_core::ColloquyConfig;

/// Shared application state, passed to handlers via axum's `State`
/// extractor. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ColloquyConfig>,
    /// Backend that stores chats and produces replies.
    pub service: Arc<dyn ConversationService>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ColloquyConfig, service: Arc<dyn ConversationService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
            start_time: Instant::now(),
        }
    }

    /// State over a fresh in-memory backend with echo replies.
    pub fn in_memory(config: ColloquyConfig) -> Self {
        Self::new(config, Arc::new(MemoryConversationService::new()))
    }
}
