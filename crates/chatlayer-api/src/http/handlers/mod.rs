//! REST handlers. Every authenticated handler first counts the request
//! against the caller's budget for its route name.

pub mod chat;
pub mod system_prompt;
pub mod usage;

/// Rate-limit endpoint names for routes other than `POST /chat`.
pub const HISTORY_ENDPOINT: &str = "history";
pub const DELETE_ENDPOINT: &str = "delete";
pub const SYSTEM_PROMPT_ENDPOINT: &str = "system_prompt";
pub const USAGE_ENDPOINT: &str = "usage";
