//! Chat identifier, message, and chat summary types.
//!
//! A chat is nothing more than the set of messages sharing a `chat_id`;
//! there is no separate chat record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::error::ChatIdError;

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

/// Maximum length of a chat identifier.
pub const MAX_CHAT_ID_LEN: usize = 50;

/// Title shown for chats without any user message.
pub const DEFAULT_CHAT_TITLE: &str = "Conversation";

/// Characters of the first user message kept in a derived title.
const TITLE_PREFIX_CHARS: usize = 30;

/// Identifier grouping messages into one conversation.
///
/// Either client-supplied or generated. Only `[A-Za-z0-9_-]` is allowed,
/// 1 to 50 characters, so ids are safe to embed in paths and URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatId(String);

impl ChatId {
    /// Validate and wrap a chat identifier.
    pub fn parse(raw: &str) -> Result<Self, ChatIdError> {
        if raw.is_empty() {
            return Err(ChatIdError::Empty);
        }
        if raw.len() > MAX_CHAT_ID_LEN {
            return Err(ChatIdError::TooLong(raw.len()));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ChatIdError::InvalidCharacter(c));
        }
        Ok(Self(raw.to_string()))
    }

    /// Generate a fresh chat id for a conversation started without one.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChatId {
    type Err = ChatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChatId {
    type Error = ChatIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChatId> for String {
    fn from(id: ChatId) -> Self {
        id.0
    }
}

/// A single persisted chat message.
///
/// Messages are ordered by `timestamp` within a chat; insertion order
/// breaks ties. Only the system message's `content` is ever rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: ChatId,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub tokens_used: u32,
}

/// One row of the chat list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    pub title: String,
    pub message_count: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derive a chat title from its first user message.
///
/// Keeps the first 30 characters and appends `...` when truncated.
pub fn derive_title(first_user_message: Option<&str>) -> String {
    match first_user_message {
        Some(text) if !text.trim().is_empty() => {
            let text = text.trim();
            if text.chars().count() > TITLE_PREFIX_CHARS {
                let prefix: String = text.chars().take(TITLE_PREFIX_CHARS).collect();
                format!("{prefix}...")
            } else {
                text.to_string()
            }
        }
        _ => DEFAULT_CHAT_TITLE.to_string(),
    }
}
