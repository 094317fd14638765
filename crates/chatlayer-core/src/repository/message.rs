//! MessageRepository trait definition.

use chatlayer_types::chat::{ChatId, ChatSummary, Message, MessageRole};
use chatlayer_types::error::RepositoryError;

/// Default page size for `list`.
pub const DEFAULT_LIST_LIMIT: u32 = 1000;

/// Default window for `latest`.
pub const DEFAULT_LATEST_LIMIT: u32 = 10;

/// Persistence of chat messages, keyed by chat id.
///
/// Within one chat, messages are ordered by timestamp with insertion order
/// breaking ties. A chat holds at most one system message, and that message
/// is the only one ever rewritten.
pub trait MessageRepository: Send + Sync {
    /// Store one message stamped with the store's current time.
    ///
    /// Rejects blank content with `RepositoryError::Invalid`. Appending a
    /// second system message to a chat fails with `RepositoryError::Conflict`;
    /// use `upsert_system_message` instead.
    fn append(
        &self,
        chat_id: &ChatId,
        role: MessageRole,
        content: &str,
        tokens_used: u32,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// Messages of a chat in chronological order, skipping `offset` and
    /// returning at most `limit`. Unknown chats yield an empty list.
    fn list(
        &self,
        chat_id: &ChatId,
        offset: u32,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// The newest `limit` messages of a chat, newest first.
    fn latest(
        &self,
        chat_id: &ChatId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// The chat's system message, if it has one.
    fn get_system_message(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Option<Message>, RepositoryError>> + Send;

    /// Create the chat's system message or replace its content.
    ///
    /// An existing system message keeps its id and timestamp. Concurrent
    /// calls for one chat leave exactly one system message behind.
    fn upsert_system_message(
        &self,
        chat_id: &ChatId,
        content: &str,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// Delete every message of a chat, returning how many were removed.
    fn delete_chat(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Summaries of all chats, most recently updated first.
    fn list_chats(
        &self,
        offset: u32,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSummary>, RepositoryError>> + Send;
}
