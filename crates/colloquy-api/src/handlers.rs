//! Route handlers for the conversation endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use colloquy_core::{Chat, ChatId, ChatTranscript, Message};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request / response bodies
// =============================================================================

/// Body for `POST /chats`. A missing or blank name gets the configured
/// default.
#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Body for `POST /chats/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub chat_count: usize,
}

// =============================================================================
// Health
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let chat_count = state.service.list_chats().await?.len();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        chat_count,
    }))
}

// =============================================================================
// Chats
// =============================================================================

/// GET /chats - newest first.
pub async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<Chat>>, ApiError> {
    let mut chats = state.service.list_chats().await?;
    chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(chats))
}

/// POST /chats
pub async fn create_chat(
    State(state): State<AppState>,
    Json(req): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| state.config.chat.default_chat_name.clone());
    let chat = state.service.create_chat(&name).await?;
    tracing::info!(chat_id = %chat.id, name = %chat.name, "Chat created");
    Ok((StatusCode::CREATED, Json(chat)))
}

/// GET /chats/{id} - the chat with its transcript.
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatTranscript>, ApiError> {
    let transcript = state.service.get_chat(&ChatId::new(id)).await?;
    Ok(Json(transcript))
}

/// DELETE /chats/{id}
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let chat_id = ChatId::new(id);
    state.service.delete_chat(&chat_id).await?;
    tracing::info!(chat_id = %chat_id, "Chat deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Messages
// =============================================================================

/// POST /chats/{id}/messages - store the user message, generate the reply,
/// answer with the message the backend acknowledges.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<Message>, ApiError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ApiError::UnprocessableEntity(
            "message cannot be empty".to_string(),
        ));
    }
    let max = state.config.chat.max_message_length;
    if content.chars().count() > max {
        return Err(ApiError::UnprocessableEntity(format!(
            "message exceeds {max} characters"
        )));
    }

    let chat_id = ChatId::new(id);
    let acked = state.service.submit_message(&chat_id, content).await?;
    tracing::debug!(chat_id = %chat_id, message_id = %acked.id, role = %acked.role, "Message accepted");
    Ok(Json(acked))
}

/// GET /chats/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let messages = state.service.list_messages(&ChatId::new(id)).await?;
    Ok(Json(messages))
}
