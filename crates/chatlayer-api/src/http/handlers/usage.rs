//! GET /usage - The caller's request count for one endpoint.

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatlayer_core::repository::rate_limit::DEFAULT_PERIOD_HOURS;
use chatlayer_types::rate_limit::CHAT_ENDPOINT;

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::handlers::USAGE_ENDPOINT;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub endpoint: Option<String>,
    pub hours: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub user_id: String,
    pub endpoint: String,
    pub hours: u32,
    pub usage: u64,
    /// 0 when no ceiling is configured.
    pub limit: u64,
    pub remaining: Option<u64>,
}

pub async fn get_usage(
    State(state): State<AppState>,
    auth: Authenticated,
    query: Result<Query<UsageQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<UsageReport>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();
    let Query(query) = query?;

    let endpoint = query.endpoint.unwrap_or_else(|| CHAT_ENDPOINT.to_string());
    let hours = query.hours.unwrap_or(DEFAULT_PERIOD_HOURS);
    if hours == 0 {
        return Err(AppError::Validation("hours must be at least 1".to_string()));
    }

    state
        .chat_service
        .admit(&auth.user_id, USAGE_ENDPOINT)
        .await?;

    let usage = state
        .chat_service
        .usage(&auth.user_id, &endpoint, hours)
        .await?;
    let limit = state.chat_service.settings().requests_per_hour;

    let report = UsageReport {
        user_id: auth.user_id,
        endpoint,
        hours,
        usage,
        limit,
        remaining: (limit > 0).then(|| limit.saturating_sub(usage)),
    };

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(report, request_id, elapsed)))
}
