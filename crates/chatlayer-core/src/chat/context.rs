//! Assembly of the message list sent to the LLM.

use chatlayer_types::chat::{Message, MessageRole};
use chatlayer_types::llm::LlmMessage;

/// Build the LLM context for one turn.
///
/// `recent` is newest first, as returned by `MessageRepository::latest`.
/// System messages in it are dropped, at most `window` of the rest are kept,
/// and they are emitted oldest first after the system message.
pub fn build_context(system: Option<&Message>, recent: &[Message], window: usize) -> Vec<LlmMessage> {
    let mut turns: Vec<&Message> = recent
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .take(window)
        .collect();
    turns.reverse();

    system
        .into_iter()
        .chain(turns)
        .map(|m| LlmMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect()
}
