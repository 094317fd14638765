//! API key authentication extractor.
//!
//! Extracts and verifies the API key from:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! The provided key is SHA-256 hashed and compared with the hash of the
//! configured key. The caller's user id is derived from the same hash.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sha2::{Digest, Sha256};

use crate::http::error::AppError;
use crate::state::AppState;

/// Hex characters of the key hash used as the caller's user id.
const USER_ID_LEN: usize = 16;

/// An authenticated caller. Extracting this validates the API key.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user_id: String,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = extract_api_key(parts)?;
        let key_hash = hash_api_key(&api_key);

        match state.api_key_hash.as_deref() {
            Some(expected) if expected == key_hash => Ok(Authenticated {
                user_id: user_id_for_hash(&key_hash),
            }),
            _ => {
                tracing::debug!("Rejected request with invalid API key");
                Err(AppError::Unauthorized(
                    "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
                ))
            }
        }
    }
}

fn extract_api_key(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(key_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// User id for a key hash: its first 16 hex characters.
pub fn user_id_for_hash(key_hash: &str) -> String {
    key_hash.chars().take(USER_ID_LEN).collect()
}

/// User id a given API key authenticates as.
pub fn user_id_for_key(key: &str) -> String {
    user_id_for_hash(&hash_api_key(key))
}
