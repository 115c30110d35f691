use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::llm::{ChatMessage, Role};

/// One turn of an advisor conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StoredMessage {
    pub id: i64,
    pub session_id: Uuid,
    pub role: String, // "user" | "assistant"
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl StoredMessage {
    pub fn to_chat_message(&self) -> ChatMessage {
        if self.role == Role::Assistant.as_str() {
            ChatMessage::assistant(self.content.clone())
        } else {
            ChatMessage::user(self.content.clone())
        }
    }
}
