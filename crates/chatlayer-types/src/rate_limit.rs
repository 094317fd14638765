//! Rate-limit bucket type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Endpoint name used to count chat completions.
pub const CHAT_ENDPOINT: &str = "chat";

/// Hour-aligned usage counter for one `(user_id, endpoint)` pair.
///
/// At most one bucket exists per `(user_id, endpoint, period_start)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitBucket {
    pub user_id: String,
    pub endpoint: String,
    /// Start of the wall-clock hour this bucket covers (UTC, zero minutes/seconds).
    pub period_start: DateTime<Utc>,
    pub request_count: u64,
}
