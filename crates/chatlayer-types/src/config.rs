//! Configuration types for chatlayer.
//!
//! `AppConfig` mirrors `config.toml` in the data directory. Every section and
//! field has a default, so an empty or missing file yields a working setup
//! (apart from the API key, which `serve` requires).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database location. `None` means `{data_dir}/chatlayer.db`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: Option<String>,
}

/// API authentication.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer key accepted by the REST API.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// LLM runtime connection and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the Ollama server.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_llm_model() -> String {
    "llama3.1:8b-instruct-q8_0".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_llm_timeout_secs() -> u64 {
    300
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

/// Rate-limit policy and bucket retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Ceiling per user and endpoint over `period_hours`. 0 disables the ceiling.
    #[serde(default = "default_requests_per_hour")]
    pub requests_per_hour: u64,
    #[serde(default = "default_period_hours")]
    pub period_hours: u32,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_requests_per_hour() -> u64 {
    1000
}

fn default_period_hours() -> u32 {
    1
}

fn default_retention_hours() -> u32 {
    24
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: default_requests_per_hour(),
            period_hours: default_period_hours(),
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System prompt given to chats that have none yet.
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
    /// Number of most recent non-system messages sent to the LLM.
    #[serde(default = "default_context_messages")]
    pub context_messages: u32,
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".to_string()
}

fn default_context_messages() -> u32 {
    20
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_system_prompt: default_system_prompt(),
            context_messages: default_context_messages(),
        }
    }
}
