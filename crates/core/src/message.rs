//! Chat message records as returned by the chat history endpoint.

use serde::{Deserialize, Serialize};

/// A single message in a server-side chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub is_user_message: bool,
    pub content: String,
    /// Timestamp as sent by the service (RFC 3339 in practice).
    pub created_at: String,
}

impl ChatMessage {
    /// Short label for who wrote the message.
    pub fn author(&self) -> &'static str {
        if self.is_user_message { "Human" } else { "AI" }
    }

    /// Keep only the entries of a history payload that have the message shape.
    pub fn filter_valid(values: Vec<serde_json::Value>) -> Vec<ChatMessage> {
        values
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }
}
