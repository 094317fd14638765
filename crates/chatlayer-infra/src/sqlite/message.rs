//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `chatlayer-core`. Reads go through the
//! reader pool; every write is a single statement on the writer pool. The
//! system-prompt upsert relies on the partial unique index
//! `idx_messages_chat_system`, which makes "at most one system message per
//! chat" hold even across processes.

use chatlayer_core::clock::{SharedClock, system_clock};
use chatlayer_core::repository::message::MessageRepository;
use chatlayer_types::chat::{ChatId, ChatSummary, Message, MessageRole, derive_title};
use chatlayer_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_error, parse_datetime};

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
    clock: SharedClock,
}

impl SqliteMessageRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self::with_clock(pool, system_clock())
    }

    /// Stamp messages with `clock` instead of the system time.
    pub fn with_clock(pool: DatabasePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct MessageRow {
    id: String,
    chat_id: String,
    role: String,
    content: String,
    timestamp: String,
    tokens_used: i64,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            timestamp: row.try_get("timestamp")?,
            tokens_used: row.try_get("tokens_used")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let chat_id = ChatId::parse(&self.chat_id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat_id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let tokens_used = u32::try_from(self.tokens_used)
            .map_err(|e| RepositoryError::Query(format!("invalid tokens_used: {e}")))?;

        Ok(Message {
            id,
            chat_id,
            role,
            content: self.content,
            timestamp: parse_datetime(&self.timestamp)?,
            tokens_used,
        })
    }
}

struct ChatSummaryRow {
    chat_id: String,
    message_count: i64,
    started_at: String,
    updated_at: String,
    first_user_message: Option<String>,
}

impl ChatSummaryRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            chat_id: row.try_get("chat_id")?,
            message_count: row.try_get("message_count")?,
            started_at: row.try_get("started_at")?,
            updated_at: row.try_get("updated_at")?,
            first_user_message: row.try_get("first_user_message")?,
        })
    }

    fn into_summary(self) -> Result<ChatSummary, RepositoryError> {
        let chat_id = ChatId::parse(&self.chat_id)
            .map_err(|e| RepositoryError::Query(format!("invalid chat_id: {e}")))?;

        Ok(ChatSummary {
            chat_id,
            title: derive_title(self.first_user_message.as_deref()),
            message_count: self.message_count as u32,
            started_at: parse_datetime(&self.started_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn rows_to_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Message>, RepositoryError> {
    rows.iter()
        .map(|row| {
            MessageRow::from_row(row)
                .map_err(map_sqlx_error)?
                .into_message()
        })
        .collect()
}

fn require_content(content: &str) -> Result<(), RepositoryError> {
    if content.trim().is_empty() {
        return Err(RepositoryError::Invalid(
            "message content must not be empty".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MessageRepository implementation
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn append(
        &self,
        chat_id: &ChatId,
        role: MessageRole,
        content: &str,
        tokens_used: u32,
    ) -> Result<Message, RepositoryError> {
        require_content(content)?;

        let message = Message {
            id: Uuid::now_v7(),
            chat_id: chat_id.clone(),
            role,
            content: content.to_string(),
            timestamp: self.clock.now_micros(),
            tokens_used,
        };

        sqlx::query(
            r#"INSERT INTO messages (id, chat_id, role, content, timestamp, tokens_used)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.as_str())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(format_datetime(&message.timestamp))
        .bind(i64::from(message.tokens_used))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        tracing::debug!(chat_id = %chat_id, role = %role, "Message appended");
        Ok(message)
    }

    async fn list(
        &self,
        chat_id: &ChatId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, chat_id, role, content, timestamp, tokens_used
               FROM messages
               WHERE chat_id = ?
               ORDER BY timestamp ASC, rowid ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(chat_id.as_str())
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows_to_messages(&rows)
    }

    async fn latest(&self, chat_id: &ChatId, limit: u32) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, chat_id, role, content, timestamp, tokens_used
               FROM messages
               WHERE chat_id = ?
               ORDER BY timestamp DESC, rowid DESC
               LIMIT ?"#,
        )
        .bind(chat_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows_to_messages(&rows)
    }

    async fn get_system_message(&self, chat_id: &ChatId) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT id, chat_id, role, content, timestamp, tokens_used
               FROM messages
               WHERE chat_id = ? AND role = 'system'"#,
        )
        .bind(chat_id.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            Some(row) => {
                let r = MessageRow::from_row(&row).map_err(map_sqlx_error)?;
                Ok(Some(r.into_message()?))
            }
            None => Ok(None),
        }
    }

    async fn upsert_system_message(
        &self,
        chat_id: &ChatId,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        require_content(content)?;

        // A replaced row keeps its id and timestamp; only content changes.
        let row = sqlx::query(
            r#"INSERT INTO messages (id, chat_id, role, content, timestamp, tokens_used)
               VALUES (?, ?, 'system', ?, ?, 0)
               ON CONFLICT (chat_id) WHERE role = 'system'
               DO UPDATE SET content = excluded.content
               RETURNING id, chat_id, role, content, timestamp, tokens_used"#,
        )
        .bind(Uuid::now_v7().to_string())
        .bind(chat_id.as_str())
        .bind(content)
        .bind(format_datetime(&self.clock.now_micros()))
        .fetch_one(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        tracing::debug!(chat_id = %chat_id, "System message upserted");
        MessageRow::from_row(&row)
            .map_err(map_sqlx_error)?
            .into_message()
    }

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM messages WHERE chat_id = ?")
            .bind(chat_id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn list_chats(&self, offset: u32, limit: u32) -> Result<Vec<ChatSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT m.chat_id AS chat_id,
                      COUNT(*) AS message_count,
                      MIN(m.timestamp) AS started_at,
                      MAX(m.timestamp) AS updated_at,
                      (SELECT u.content FROM messages u
                        WHERE u.chat_id = m.chat_id AND u.role = 'user'
                        ORDER BY u.timestamp ASC, u.rowid ASC
                        LIMIT 1) AS first_user_message
               FROM messages m
               GROUP BY m.chat_id
               ORDER BY updated_at DESC, m.chat_id ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                ChatSummaryRow::from_row(row)
                    .map_err(map_sqlx_error)?
                    .into_summary()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chatlayer_core::clock::ManualClock;
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::sqlite::test_support::test_pool;

    fn chat(id: &str) -> ChatId {
        ChatId::parse(id).unwrap()
    }

    async fn repo_with_clock() -> (SqliteMessageRepository, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap(),
        ));
        let repo = SqliteMessageRepository::with_clock(test_pool().await, clock.clone());
        (repo, clock)
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let (repo, clock) = repo_with_clock().await;
        let id = chat("chat-1");

        let stored = repo.append(&id, MessageRole::User, "Hello", 0).await.unwrap();
        clock.advance(TimeDelta::seconds(2));
        repo.append(&id, MessageRole::Assistant, "Hi!", 9).await.unwrap();

        let messages = repo.list(&id, 0, 1000).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], stored);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].tokens_used, 9);
    }

    #[tokio::test]
    async fn test_sub_microsecond_clock_round_trips() {
        let (repo, clock) = repo_with_clock().await;
        clock.advance(TimeDelta::nanoseconds(123_456_789));
        let id = chat("precise");

        let appended = repo.append(&id, MessageRole::User, "Hello", 0).await.unwrap();
        let system = repo.upsert_system_message(&id, "Be brief.").await.unwrap();

        assert_eq!(appended.timestamp.timestamp_subsec_nanos(), 123_456_000);
        assert_eq!(repo.list(&id, 0, 1000).await.unwrap()[0], appended);
        assert_eq!(repo.get_system_message(&id).await.unwrap(), Some(system));
    }

    #[tokio::test]
    async fn test_order_is_by_timestamp_then_insertion() {
        let (repo, clock) = repo_with_clock().await;
        let id = chat("order");

        clock.advance(TimeDelta::seconds(10));
        repo.append(&id, MessageRole::User, "late", 0).await.unwrap();
        clock.set(Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap());
        repo.append(&id, MessageRole::User, "early-1", 0).await.unwrap();
        repo.append(&id, MessageRole::User, "early-2", 0).await.unwrap();

        let contents: Vec<_> = repo
            .list(&id, 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, ["early-1", "early-2", "late"]);

        let newest: Vec<_> = repo
            .latest(&id, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(newest, ["late", "early-2"]);
    }

    #[tokio::test]
    async fn test_list_pagination_and_unknown_chat() {
        let (repo, clock) = repo_with_clock().await;
        let id = chat("paged");
        for i in 0..5 {
            repo.append(&id, MessageRole::User, &format!("m{i}"), 0)
                .await
                .unwrap();
            clock.advance(TimeDelta::seconds(1));
        }

        let page: Vec<_> = repo
            .list(&id, 2, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(page, ["m2", "m3"]);
        assert!(repo.list(&chat("nobody"), 0, 10).await.unwrap().is_empty());
        assert!(repo.latest(&chat("nobody"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_content_rejected() {
        let (repo, _clock) = repo_with_clock().await;
        let err = repo
            .append(&chat("c"), MessageRole::User, "", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)));
        let err = repo.upsert_system_message(&chat("c"), " \t").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_content_in_place() {
        let (repo, clock) = repo_with_clock().await;
        let id = chat("sys");

        assert!(repo.get_system_message(&id).await.unwrap().is_none());
        let created = repo.upsert_system_message(&id, "Be terse.").await.unwrap();
        repo.append(&id, MessageRole::User, "hi", 0).await.unwrap();
        clock.advance(TimeDelta::hours(1));
        let updated = repo.upsert_system_message(&id, "Be verbose.").await.unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(created.timestamp, updated.timestamp);
        assert_eq!(updated.content, "Be verbose.");

        let messages = repo.list(&id, 0, 10).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, "Be verbose.");
    }

    #[tokio::test]
    async fn test_second_system_append_is_conflict() {
        let (repo, _clock) = repo_with_clock().await;
        let id = chat("dup");
        repo.append(&id, MessageRole::System, "one", 0).await.unwrap();
        let err = repo
            .append(&id, MessageRole::System, "two", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_leave_single_system_message() {
        let repo = Arc::new(SqliteMessageRepository::new(test_pool().await));
        let id = chat("race");

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                repo.upsert_system_message(&id, &format!("prompt {i}"))
                    .await
                    .unwrap()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1, "every upsert must return the same row");

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = 'race' AND role = 'system'")
                .fetch_one(&repo.pool.reader)
                .await
                .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_delete_chat_only_touches_that_chat() {
        let (repo, _clock) = repo_with_clock().await;
        let a = chat("a");
        let b = chat("b");
        repo.upsert_system_message(&a, "sys").await.unwrap();
        repo.append(&a, MessageRole::User, "x", 0).await.unwrap();
        repo.append(&b, MessageRole::User, "y", 0).await.unwrap();

        assert_eq!(repo.delete_chat(&a).await.unwrap(), 2);
        assert_eq!(repo.delete_chat(&a).await.unwrap(), 0);
        assert!(repo.get_system_message(&a).await.unwrap().is_none());
        assert_eq!(repo.list(&b, 0, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_chats_summaries() {
        let (repo, clock) = repo_with_clock().await;
        let first = chat("first");
        let second = chat("second");

        repo.upsert_system_message(&first, "sys").await.unwrap();
        repo.append(&first, MessageRole::User, "Explain the borrow checker in detail please", 0)
            .await
            .unwrap();
        clock.advance(TimeDelta::minutes(1));
        repo.append(&first, MessageRole::Assistant, "Sure.", 3)
            .await
            .unwrap();
        clock.advance(TimeDelta::minutes(1));
        repo.upsert_system_message(&second, "sys").await.unwrap();

        let chats = repo.list_chats(0, 10).await.unwrap();
        assert_eq!(chats.len(), 2);

        assert_eq!(chats[0].chat_id, second);
        assert_eq!(chats[0].title, "Conversation");
        assert_eq!(chats[0].message_count, 1);

        assert_eq!(chats[1].chat_id, first);
        assert_eq!(chats[1].title, "Explain the borrow checker in ...");
        assert_eq!(chats[1].message_count, 3);
        assert_eq!(chats[1].updated_at - chats[1].started_at, TimeDelta::minutes(1));

        let tail = repo.list_chats(1, 10).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].chat_id, first);
    }
}
