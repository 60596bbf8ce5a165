use colloquy_chat::ChatError;
use colloquy_core::ChatId;
use serde::Deserialize;

/// Transport-level failures talking to the conversation service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Error body produced by the server: `{ "error": ..., "message": ... }`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteError {
    /// Build a status error from a response body, preferring the server's
    /// own message over the raw body.
    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.error)
            .unwrap_or_else(|| body.trim().to_string());
        RemoteError::Status { status, message }
    }

    /// Map onto the synchronisation error taxonomy. A 404 on a request
    /// that named a chat means the chat is gone; 400 and 422 are rejected
    /// input; everything else is a network failure.
    pub fn into_chat_error(self, chat_id: Option<&ChatId>) -> ChatError {
        match (&self, chat_id) {
            (RemoteError::Status { status: 404, .. }, Some(id)) => ChatError::UnknownChat(id.clone()),
            (RemoteError::Status { status: 400 | 422, message }, _) => {
                ChatError::ValidationFailure(message.clone())
            }
            _ => ChatError::from(self),
        }
    }
}

impl From<RemoteError> for ChatError {
    fn from(err: RemoteError) -> Self {
        ChatError::NetworkFailure(err.to_string())
    }
}
