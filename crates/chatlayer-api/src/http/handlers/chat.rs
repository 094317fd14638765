//! Chat HTTP handlers.
//!
//! Endpoints:
//! - POST   /chat                    - Run one conversational turn
//! - GET    /chat/history            - List chats
//! - GET    /chat/history/{chat_id}  - Messages of one chat
//! - DELETE /chat/delete/{chat_id}   - Delete a chat

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatlayer_core::chat::service::ChatReply;
use chatlayer_core::repository::message::DEFAULT_LIST_LIMIT;
use chatlayer_types::chat::{ChatSummary, Message};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::handlers::{DELETE_ENDPOINT, HISTORY_ENDPOINT};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: u32,
    pub limit: Option<u32>,
}

fn default_chat_list_limit() -> u32 {
    50
}

#[derive(Debug, Serialize)]
pub struct ChatList {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistory {
    pub chat_id: String,
    pub history: HistoryPage,
}

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct DeletedChat {
    pub chat_id: String,
    pub deleted: u64,
}

/// POST /chat - Send a message and wait for the model's reply.
pub async fn send_message(
    State(state): State<AppState>,
    auth: Authenticated,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ChatReply>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let Json(body) = payload?;

    let reply = state
        .chat_service
        .send(&auth.user_id, &body.message, body.chat_id.as_deref())
        .await?;

    let self_link = format!("/chat/history/{}", reply.chat_id);
    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(reply, request_id, elapsed).with_link("history", &self_link),
    ))
}

/// GET /chat/history - List chats, most recently active first.
pub async fn list_chats(
    State(state): State<AppState>,
    auth: Authenticated,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ChatList>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let Query(page) = query?;

    state
        .chat_service
        .admit(&auth.user_id, HISTORY_ENDPOINT)
        .await?;

    let chats = state
        .chat_service
        .list_chats(page.offset, page.limit.unwrap_or_else(default_chat_list_limit))
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(
        ApiResponse::success(ChatList { chats }, request_id, elapsed)
            .with_link("self", "/chat/history"),
    ))
}

/// GET /chat/history/{chat_id} - Messages of one chat in chronological order.
pub async fn get_history(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(chat_id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ChatHistory>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let Query(page) = query?;

    state
        .chat_service
        .admit(&auth.user_id, HISTORY_ENDPOINT)
        .await?;

    let messages = state
        .chat_service
        .history(&chat_id, page.offset, page.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;
    let self_link = format!("/chat/history/{chat_id}");
    let body = ChatHistory {
        chat_id,
        history: HistoryPage { messages },
    };
    Ok(Json(
        ApiResponse::success(body, request_id, elapsed).with_link("self", &self_link),
    ))
}

/// DELETE /chat/delete/{chat_id} - Delete a chat and all its messages.
pub async fn delete_chat(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(chat_id): Path<String>,
) -> Result<Json<ApiResponse<DeletedChat>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    state
        .chat_service
        .admit(&auth.user_id, DELETE_ENDPOINT)
        .await?;

    let deleted = state.chat_service.delete_chat(&chat_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        DeletedChat { chat_id, deleted },
        request_id,
        elapsed,
    )))
}
