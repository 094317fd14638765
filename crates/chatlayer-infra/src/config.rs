//! Configuration loader for chatlayer.
//!
//! Reads `config.toml` from the data directory (`~/.chatlayer/` by default)
//! into [`AppConfig`], then applies environment overrides. Falls back to
//! defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use chatlayer_types::config::AppConfig;
use secrecy::SecretString;

use crate::sqlite::pool::database_url_for;

pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory.
///
/// Priority:
/// 1. `CHATLAYER_DATA_DIR` environment variable
/// 2. `~/.chatlayer`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CHATLAYER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".chatlayer");
    }

    PathBuf::from(".chatlayer")
}

/// Load `{data_dir}/config.toml` and apply process environment overrides.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config = load_config_file(data_dir).await;
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Parse `{data_dir}/config.toml`, or defaults when absent or unreadable.
pub async fn load_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Overlay environment variables on a loaded config.
///
/// `lookup` resolves a variable name; the process environment in production.
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("CHATLAYER_API_KEY").or_else(|| non_empty("API_KEY")) {
        config.auth.api_key = Some(key);
    }

    if let Some(raw) = non_empty("RATE_LIMIT_PER_HOUR") {
        match raw.trim().parse::<u64>() {
            Ok(limit) => config.rate_limit.requests_per_hour = limit,
            Err(err) => tracing::warn!("Ignoring RATE_LIMIT_PER_HOUR={raw:?}: {err}"),
        }
    }

    if let Some(url) = non_empty("CHATLAYER_DATABASE_URL") {
        config.database.url = Some(url);
    }
    if let Some(url) = non_empty("CHATLAYER_LLM_URL") {
        config.llm.base_url = url;
    }
    if let Some(model) = non_empty("CHATLAYER_LLM_MODEL") {
        config.llm.model = model;
    }

    config
}

/// The database URL to open: the configured one, else the data dir's file.
pub fn database_url(config: &AppConfig, data_dir: &Path) -> String {
    config
        .database
        .url
        .clone()
        .unwrap_or_else(|| database_url_for(data_dir))
}

/// The configured API key, wrapped so it never reaches logs.
pub fn api_key(config: &AppConfig) -> Option<SecretString> {
    config
        .auth
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::from(k.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn load_config_file_missing_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.rate_limit.requests_per_hour, 1000);
        assert_eq!(config.server.port, 8000);
    }

    #[tokio::test]
    async fn load_config_file_valid_toml() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[rate_limit]
requests_per_hour = 50

[llm]
model = "mistral:7b"
"#,
        )
        .await
        .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.rate_limit.requests_per_hour, 50);
        assert_eq!(config.rate_limit.retention_hours, 24);
        assert_eq!(config.llm.model, "mistral:7b");
        assert_eq!(config.llm.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn load_config_file_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.rate_limit.requests_per_hour, 1000);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let config = apply_env_overrides(
            AppConfig::default(),
            env(&[
                ("API_KEY", "legacy"),
                ("RATE_LIMIT_PER_HOUR", "25"),
                ("CHATLAYER_LLM_URL", "http://gpu-box:11434"),
                ("CHATLAYER_DATABASE_URL", "sqlite:///srv/chat.db"),
            ]),
        );
        assert_eq!(config.auth.api_key.as_deref(), Some("legacy"));
        assert_eq!(config.rate_limit.requests_per_hour, 25);
        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(
            database_url(&config, Path::new("/unused")),
            "sqlite:///srv/chat.db"
        );
    }

    #[test]
    fn chatlayer_api_key_wins_over_alias() {
        let config = apply_env_overrides(
            AppConfig::default(),
            env(&[("CHATLAYER_API_KEY", "primary"), ("API_KEY", "legacy")]),
        );
        let key = api_key(&config).unwrap();
        assert_eq!(key.expose_secret(), "primary");
    }

    #[test]
    fn invalid_rate_limit_is_ignored() {
        let config = apply_env_overrides(
            AppConfig::default(),
            env(&[("RATE_LIMIT_PER_HOUR", "lots")]),
        );
        assert_eq!(config.rate_limit.requests_per_hour, 1000);
    }

    #[test]
    fn missing_api_key_is_none() {
        let config = apply_env_overrides(AppConfig::default(), env(&[("API_KEY", "  ")]));
        assert!(api_key(&config).is_none());
    }

    #[test]
    fn database_url_defaults_to_data_dir() {
        let url = database_url(&AppConfig::default(), Path::new("/data"));
        assert_eq!(url, "sqlite:///data/chatlayer.db");
    }
}
