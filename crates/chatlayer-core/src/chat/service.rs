//! Chat service orchestrating admission, context, and message persistence.
//!
//! ChatService coordinates the MessageRepository, RateLimitRepository and
//! LlmProvider for one conversational turn: check the caller's hourly
//! budget, make sure the chat has a system prompt, store the user message,
//! ask the model, and store its reply.

use std::time::Instant;

use chatlayer_types::chat::{ChatId, ChatSummary, Message, MessageRole};
use chatlayer_types::config::AppConfig;
use chatlayer_types::error::ChatError;
use chatlayer_types::llm::{CompletionRequest, LlmError};
use chatlayer_types::rate_limit::{CHAT_ENDPOINT, RateLimitBucket};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chat::context::build_context;
use crate::llm::provider::LlmProvider;
use crate::repository::message::MessageRepository;
use crate::repository::rate_limit::RateLimitRepository;

/// Tunables for `ChatService`, usually derived from `AppConfig`.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Requests allowed per `(user, endpoint)` within `period_hours`. 0 disables the ceiling.
    pub requests_per_hour: u64,
    pub period_hours: u32,
    /// Most recent non-system messages sent to the model each turn.
    pub context_messages: u32,
    pub default_system_prompt: String,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            requests_per_hour: config.rate_limit.requests_per_hour,
            period_hours: config.rate_limit.period_hours,
            context_messages: config.chat.context_messages,
            default_system_prompt: config.chat.default_system_prompt.clone(),
            model: config.llm.model.clone(),
            temperature: Some(config.llm.temperature),
            max_tokens: config.llm.max_tokens,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// The model's answer to one `send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub chat_id: ChatId,
}

/// Orchestrates one chat turn and the chat management operations.
///
/// Generic over the repositories and the provider so chatlayer-core never
/// depends on chatlayer-infra.
pub struct ChatService<M: MessageRepository, R: RateLimitRepository, L: LlmProvider> {
    messages: M,
    rate_limits: R,
    llm: L,
    settings: ChatSettings,
}

impl<M, R, L> ChatService<M, R, L>
where
    M: MessageRepository,
    R: RateLimitRepository,
    L: LlmProvider,
{
    pub fn new(messages: M, rate_limits: R, llm: L, settings: ChatSettings) -> Self {
        Self {
            messages,
            rate_limits,
            llm,
            settings,
        }
    }

    pub fn messages(&self) -> &M {
        &self.messages
    }

    pub fn rate_limits(&self) -> &R {
        &self.rate_limits
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    // --- Admission ---

    /// Count one request for `(user_id, endpoint)` if the caller is under
    /// the ceiling, returning usage including this request.
    ///
    /// A rejected request is not counted.
    pub async fn admit(&self, user_id: &str, endpoint: &str) -> Result<u64, ChatError> {
        let limit = self.settings.requests_per_hour;
        let usage = self
            .rate_limits
            .current_usage(user_id, endpoint, self.settings.period_hours)
            .await?;

        if limit > 0 && usage >= limit {
            warn!(user_id, endpoint, usage, limit, "Rate limit exceeded");
            return Err(ChatError::RateLimited { usage, limit });
        }

        self.rate_limits.increment(user_id, endpoint).await?;
        Ok(usage + 1)
    }

    // --- Conversation ---

    /// Run one conversational turn.
    ///
    /// Without a `chat_id` a new chat is started under a generated id.
    pub async fn send(
        &self,
        user_id: &str,
        message: &str,
        chat_id: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let chat_id = match chat_id {
            Some(raw) => ChatId::parse(raw)?,
            None => ChatId::generate(),
        };

        self.admit(user_id, CHAT_ENDPOINT).await?;

        let system = match self.messages.get_system_message(&chat_id).await? {
            Some(system) => system,
            None => {
                debug!(chat_id = %chat_id, "Seeding default system prompt");
                self.messages
                    .upsert_system_message(&chat_id, &self.settings.default_system_prompt)
                    .await?
            }
        };

        self.messages
            .append(&chat_id, MessageRole::User, message, 0)
            .await?;

        // One extra so a system message in the window does not shrink it.
        let recent = self
            .messages
            .latest(&chat_id, self.settings.context_messages.saturating_add(1))
            .await?;
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: build_context(
                Some(&system),
                &recent,
                self.settings.context_messages as usize,
            ),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let started = Instant::now();
        let completion = self.llm.complete(&request).await.map_err(|e| {
            warn!(chat_id = %chat_id, provider = self.llm.name(), error = %e, "Completion failed");
            e
        })?;

        if completion.content.trim().is_empty() {
            return Err(LlmError::Provider {
                message: "no valid response received from provider".to_string(),
            }
            .into());
        }

        self.messages
            .append(
                &chat_id,
                MessageRole::Assistant,
                &completion.content,
                completion.output_tokens,
            )
            .await?;

        info!(
            chat_id = %chat_id,
            provider = self.llm.name(),
            model = %completion.model,
            context_messages = request.messages.len(),
            output_tokens = completion.output_tokens,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Chat turn completed"
        );

        Ok(ChatReply {
            response: completion.content,
            chat_id,
        })
    }

    // --- Chat management ---

    /// Page through a chat's messages. A chat with no messages does not
    /// exist.
    pub async fn history(
        &self,
        chat_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Message>, ChatError> {
        let id = ChatId::parse(chat_id)?;
        let messages = self.messages.list(&id, offset, limit).await?;
        if messages.is_empty() && offset == 0 {
            // A zero limit says nothing about existence; look for one row.
            let exists = limit > 0 || !self.messages.list(&id, 0, 1).await?.is_empty();
            if !exists {
                return Err(ChatError::ChatNotFound(id.to_string()));
            }
        }
        Ok(messages)
    }

    pub async fn list_chats(&self, offset: u32, limit: u32) -> Result<Vec<ChatSummary>, ChatError> {
        Ok(self.messages.list_chats(offset, limit).await?)
    }

    /// Delete a chat, returning how many messages went with it.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<u64, ChatError> {
        let id = ChatId::parse(chat_id)?;
        let deleted = self.messages.delete_chat(&id).await?;
        if deleted == 0 {
            return Err(ChatError::ChatNotFound(id.to_string()));
        }
        info!(chat_id = %id, deleted, "Chat deleted");
        Ok(deleted)
    }

    pub async fn system_prompt(&self, chat_id: &str) -> Result<Option<Message>, ChatError> {
        let id = ChatId::parse(chat_id)?;
        Ok(self.messages.get_system_message(&id).await?)
    }

    pub async fn set_system_prompt(&self, chat_id: &str, prompt: &str) -> Result<Message, ChatError> {
        if prompt.trim().is_empty() {
            return Err(ChatError::EmptySystemPrompt);
        }
        let id = ChatId::parse(chat_id)?;
        let message = self.messages.upsert_system_message(&id, prompt).await?;
        info!(chat_id = %id, "System prompt updated");
        Ok(message)
    }

    // --- Usage ---

    pub async fn usage(&self, user_id: &str, endpoint: &str, period_hours: u32) -> Result<u64, ChatError> {
        Ok(self
            .rate_limits
            .current_usage(user_id, endpoint, period_hours)
            .await?)
    }

    pub async fn buckets(&self, user_id: &str, endpoint: &str) -> Result<Vec<RateLimitBucket>, ChatError> {
        Ok(self.rate_limits.list_buckets(user_id, endpoint).await?)
    }

    pub async fn clean_old_records(&self, retention_hours: u32) -> Result<u64, ChatError> {
        let deleted = self.rate_limits.clean_old_records(retention_hours).await?;
        if deleted > 0 {
            info!(deleted, retention_hours, "Purged expired rate-limit buckets");
        }
        Ok(deleted)
    }
}
