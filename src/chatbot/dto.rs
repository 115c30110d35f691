use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    /// Continue this conversation; omitted starts a new one.
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub response: String,
}
