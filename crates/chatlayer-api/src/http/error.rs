//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use chatlayer_types::error::ChatError;

use crate::http::response::ApiResponse;

#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Unauthorized(String),
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(ChatError::EmptyMessage | ChatError::EmptySystemPrompt) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", self.message())
            }
            AppError::Chat(ChatError::InvalidChatId(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_CHAT_ID", self.message())
            }
            AppError::Chat(ChatError::ChatNotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.message())
            }
            AppError::Chat(ChatError::RateLimited { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", self.message())
            }
            AppError::Chat(ChatError::Llm(_)) => (StatusCode::BAD_GATEWAY, "LLM_ERROR", self.message()),
            AppError::Chat(ChatError::Storage(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Storage operation failed".to_string(),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::Chat(e) => e.to_string(),
            AppError::Unauthorized(m)
            | AppError::Validation(m)
            | AppError::NotFound(m)
            | AppError::Internal(m) => m.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code, error = %self.message(), "Request failed");
        }

        let details = match &self {
            AppError::Chat(ChatError::RateLimited { usage, limit }) => {
                Some(json!({ "usage": usage, "limit": limit }))
            }
            _ => None,
        };

        (status, Json(ApiResponse::error(code, &message, details))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use chatlayer_types::error::{ChatIdError, RepositoryError};
    use chatlayer_types::llm::LlmError;

    use super::*;

    fn status_and_code(err: AppError) -> (StatusCode, &'static str) {
        let (status, code, _) = err.parts();
        (status, code)
    }

    #[test]
    fn chat_errors_map_to_statuses() {
        assert_eq!(
            status_and_code(ChatError::EmptyMessage.into()),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
        assert_eq!(
            status_and_code(ChatError::InvalidChatId(ChatIdError::Empty).into()),
            (StatusCode::BAD_REQUEST, "INVALID_CHAT_ID")
        );
        assert_eq!(
            status_and_code(ChatError::ChatNotFound("x".into()).into()),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            status_and_code(ChatError::RateLimited { usage: 5, limit: 5 }.into()),
            (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
        );
        assert_eq!(
            status_and_code(ChatError::Llm(LlmError::RateLimited).into()),
            (StatusCode::BAD_GATEWAY, "LLM_ERROR")
        );
        assert_eq!(
            status_and_code(ChatError::Storage(RepositoryError::NotFound).into()),
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        );
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let err: AppError = ChatError::Storage(RepositoryError::Query("no such table: x".into())).into();
        let (_, _, message) = err.parts();
        assert!(!message.contains("no such table"));
    }
}
