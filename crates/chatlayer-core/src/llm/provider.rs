//! LlmProvider trait definition.

use chatlayer_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// A non-streaming chat completion backend.
///
/// Implementations live in chatlayer-infra (e.g., `OllamaProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send the full conversation and wait for the complete reply.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
