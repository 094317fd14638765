//! Application state wiring the service to its concrete infrastructure.
//!
//! `ChatService` is generic over its repositories and provider; AppState pins
//! it to SQLite and Ollama. Shared by CLI commands and REST handlers.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chatlayer_core::chat::service::{ChatService, ChatSettings};
use chatlayer_infra::config::{api_key, database_url, load_config, resolve_data_dir};
use chatlayer_infra::llm::OllamaProvider;
use chatlayer_infra::sqlite::{DatabasePool, SqliteMessageRepository, SqliteRateLimitRepository};
use chatlayer_types::config::AppConfig;
use secrecy::ExposeSecret;

use crate::http::extractors::auth::hash_api_key;

pub type ConcreteChatService =
    ChatService<SqliteMessageRepository, SqliteRateLimitRepository, OllamaProvider>;

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
    /// SHA-256 (hex) of the configured API key. `None` rejects every
    /// authenticated request.
    pub api_key_hash: Option<Arc<str>>,
}

impl AppState {
    /// Resolve the data dir, load config, open the database, wire the service.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        Self::from_config(config, data_dir).await
    }

    pub async fn from_config(config: AppConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        let db_url = database_url(&config, &data_dir);
        let db_pool = DatabasePool::new(&db_url)
            .await
            .with_context(|| format!("failed to open database {db_url}"))?;

        let llm = OllamaProvider::from_config(&config.llm)?;
        let chat_service = ChatService::new(
            SqliteMessageRepository::new(db_pool.clone()),
            SqliteRateLimitRepository::new(db_pool.clone()),
            llm,
            ChatSettings::from_config(&config),
        );

        let api_key_hash: Option<Arc<str>> = api_key(&config).map(|key| Arc::from(hash_api_key(key.expose_secret())));

        Ok(Self {
            chat_service: Arc::new(chat_service),
            config: Arc::new(config),
            data_dir,
            db_pool,
            api_key_hash,
        })
    }
}
