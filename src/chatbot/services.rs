use super::repo_types::StoredMessage;
use crate::llm::{ChatMessage, ADVISOR_PROMPT};

/// System instruction, then the stored turns, then the new user message.
pub fn build_conversation(history: &[StoredMessage], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(ADVISOR_PROMPT));
    messages.extend(history.iter().map(StoredMessage::to_chat_message));
    messages.push(ChatMessage::user(message));
    messages
}
