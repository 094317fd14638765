use thiserror::Error;

use crate::llm::LlmError;

/// Reasons a chat identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatIdError {
    #[error("chat id must not be empty")]
    Empty,

    #[error("chat id is {0} characters long (max 50)")]
    TooLong(usize),

    #[error("chat id contains illegal character '{0}' (allowed: letters, digits, '-', '_')")]
    InvalidCharacter(char),
}

/// Errors from repository operations (used by trait definitions in chatlayer-core).
///
/// This is the storage error surfaced to callers; the core never retries.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Errors from the chat orchestrator.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message must not be empty")]
    EmptyMessage,

    #[error("system prompt must not be empty")]
    EmptySystemPrompt,

    #[error("invalid chat id: {0}")]
    InvalidChatId(#[from] ChatIdError),

    #[error("chat '{0}' not found")]
    ChatNotFound(String),

    #[error("rate limit exceeded: {usage} of {limit} requests used")]
    RateLimited { usage: u64, limit: u64 },

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}
