//! System prompt HTTP handlers.
//!
//! Endpoints:
//! - GET /chat/{chat_id}/system-prompt - Current system message
//! - PUT /chat/{chat_id}/system-prompt - Create or replace it

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use chatlayer_types::chat::Message;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::handlers::SYSTEM_PROMPT_ENDPOINT;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SystemPromptRequest {
    pub prompt: String,
}

/// GET /chat/{chat_id}/system-prompt
pub async fn get_system_prompt(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<Message>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state
        .chat_service
        .admit(&auth.user_id, SYSTEM_PROMPT_ENDPOINT)
        .await?;

    let message = state
        .chat_service
        .system_prompt(&chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("chat '{chat_id}' has no system prompt")))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(message, request_id, elapsed)))
}

/// PUT /chat/{chat_id}/system-prompt
pub async fn set_system_prompt(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(chat_id): Path<String>,
    payload: Result<Json<SystemPromptRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Message>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let Json(body) = payload?;

    state
        .chat_service
        .admit(&auth.user_id, SYSTEM_PROMPT_ENDPOINT)
        .await?;

    let message = state
        .chat_service
        .set_system_prompt(&chat_id, &body.prompt)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(message, request_id, elapsed)))
}
