//! OllamaProvider -- concrete [`LlmProvider`] for a local Ollama runtime.
//!
//! Sends the whole conversation to `/api/chat` with streaming disabled and
//! waits for the complete reply.

use std::time::Duration;

use chatlayer_core::llm::provider::LlmProvider;
use chatlayer_types::config::LlmConfig;
use chatlayer_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::types::{OllamaChatRequest, OllamaChatResponse, OllamaErrorBody, OllamaMessage, OllamaOptions};

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(
            config.base_url.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// The default model, used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_ollama_request(&self, request: &CompletionRequest) -> OllamaChatRequest {
        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };
        let options = (request.temperature.is_some() || request.max_tokens.is_some()).then(|| {
            OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }
        });

        OllamaChatRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            options,
        }
    }
}

fn error_for_status(status: reqwest::StatusCode, body: &str) -> LlmError {
    let detail = serde_json::from_str::<OllamaErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        404 => LlmError::InvalidRequest(detail),
        429 => LlmError::RateLimited,
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {detail}"),
        },
    }
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_ollama_request(request);
        let url = self.url("/api/chat");

        tracing::debug!(model = %body.model, messages = body.messages.len(), "Sending chat request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &error_body));
        }

        let reply: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))?;

        Ok(CompletionResponse {
            content: reply.message.content,
            model: reply.model,
            input_tokens: reply.prompt_eval_count.unwrap_or(0),
            output_tokens: reply.eval_count.unwrap_or(0),
        })
    }
}
