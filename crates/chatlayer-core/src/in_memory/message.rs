use chatlayer_types::chat::{ChatId, ChatSummary, Message, MessageRole, derive_title};
use chatlayer_types::error::RepositoryError;
use dashmap::DashMap;
use uuid::Uuid;

use crate::clock::{SharedClock, system_clock};
use crate::repository::message::MessageRepository;

/// Messages held in memory, one vector per chat in insertion order.
pub struct InMemoryMessageRepository {
    chats: DashMap<ChatId, Vec<Message>>,
    clock: SharedClock,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            chats: DashMap::new(),
            clock,
        }
    }

    fn new_message(&self, chat_id: &ChatId, role: MessageRole, content: &str, tokens_used: u32) -> Message {
        Message {
            id: Uuid::now_v7(),
            chat_id: chat_id.clone(),
            role,
            content: content.to_string(),
            timestamp: self.clock.now_micros(),
            tokens_used,
        }
    }

    /// Clone of a chat's messages in chronological order.
    fn snapshot(&self, chat_id: &ChatId) -> Vec<Message> {
        let mut messages = self
            .chats
            .get(chat_id)
            .map(|r| r.value().clone())
            .unwrap_or_default();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by_key(|m| m.timestamp);
        messages
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn require_content(content: &str) -> Result<(), RepositoryError> {
    if content.trim().is_empty() {
        return Err(RepositoryError::Invalid(
            "message content must not be empty".to_string(),
        ));
    }
    Ok(())
}

impl MessageRepository for InMemoryMessageRepository {
    async fn append(
        &self,
        chat_id: &ChatId,
        role: MessageRole,
        content: &str,
        tokens_used: u32,
    ) -> Result<Message, RepositoryError> {
        require_content(content)?;
        let message = self.new_message(chat_id, role, content, tokens_used);

        let mut entry = self.chats.entry(chat_id.clone()).or_default();
        if role == MessageRole::System && entry.iter().any(|m| m.role == MessageRole::System) {
            return Err(RepositoryError::Conflict(format!(
                "chat '{chat_id}' already has a system message"
            )));
        }
        entry.push(message.clone());
        Ok(message)
    }

    async fn list(
        &self,
        chat_id: &ChatId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .snapshot(chat_id)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn latest(&self, chat_id: &ChatId, limit: u32) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .snapshot(chat_id)
            .into_iter()
            .rev()
            .take(limit as usize)
            .collect())
    }

    async fn get_system_message(&self, chat_id: &ChatId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.chats.get(chat_id).and_then(|messages| {
            messages
                .iter()
                .find(|m| m.role == MessageRole::System)
                .cloned()
        }))
    }

    async fn upsert_system_message(
        &self,
        chat_id: &ChatId,
        content: &str,
    ) -> Result<Message, RepositoryError> {
        require_content(content)?;

        let mut entry = self.chats.entry(chat_id.clone()).or_default();
        if let Some(existing) = entry.iter_mut().find(|m| m.role == MessageRole::System) {
            existing.content = content.to_string();
            return Ok(existing.clone());
        }
        let message = self.new_message(chat_id, MessageRole::System, content, 0);
        entry.push(message.clone());
        Ok(message)
    }

    async fn delete_chat(&self, chat_id: &ChatId) -> Result<u64, RepositoryError> {
        Ok(self
            .chats
            .remove(chat_id)
            .map(|(_, messages)| messages.len() as u64)
            .unwrap_or(0))
    }

    async fn list_chats(&self, offset: u32, limit: u32) -> Result<Vec<ChatSummary>, RepositoryError> {
        let mut summaries: Vec<ChatSummary> = self
            .chats
            .iter()
            .filter_map(|entry| summarize(entry.key(), entry.value()))
            .collect();

        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.chat_id.cmp(&b.chat_id))
        });

        Ok(summaries
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

fn summarize(chat_id: &ChatId, messages: &[Message]) -> Option<ChatSummary> {
    let started_at = messages.iter().map(|m| m.timestamp).min()?;
    let updated_at = messages.iter().map(|m| m.timestamp).max()?;
    let first_user = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .min_by_key(|m| m.timestamp)
        .map(|m| m.content.as_str());

    Some(ChatSummary {
        chat_id: chat_id.clone(),
        title: derive_title(first_user),
        message_count: messages.len() as u32,
        started_at,
        updated_at,
    })
}
