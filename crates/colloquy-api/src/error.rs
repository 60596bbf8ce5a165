//! API error types and JSON error response formatting.
//!
//! Every failing endpoint answers with `{ "error": <code>, "message": <text> }`
//! and a status code matching the error kind.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use colloquy_chat::ChatError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 404 Not Found - resource does not exist.
    NotFound(String),
    /// 409 Conflict - request clashes with work already in progress.
    Conflict(String),
    /// 422 Unprocessable Entity - well-formed but rejected content.
    UnprocessableEntity(String),
    /// 500 Internal Server Error.
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::UnprocessableEntity(msg) => ("unprocessable_entity", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), message = %message, "Request failed");
        }

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::UnknownChat(id) => ApiError::NotFound(format!("chat {id} not found")),
            ChatError::MessageNotFound { .. } => ApiError::NotFound(err.to_string()),
            ChatError::ValidationFailure(msg) => ApiError::UnprocessableEntity(msg),
            ChatError::SendInFlight(_) => ApiError::Conflict(err.to_string()),
            ChatError::NetworkFailure(msg) => ApiError::Internal(msg),
        }
    }
}
