//! `polyfact history` — print the messages of a chat.

use chrono::DateTime;
use polyfact_client::{Chat, ChatOptions};
use polyfact_core::ChatMessage;

use super::{CommandResult, load_config, signed_in_client};

/// `[2024-01-01 09:30] Human: hello`, keeping unparsable timestamps as sent.
pub fn format_message(message: &ChatMessage) -> String {
    let when = DateTime::parse_from_rfc3339(&message.created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| message.created_at.clone());
    format!("[{when}] {}: {}", message.author(), message.content)
}

pub async fn run(chat_id: &str) -> CommandResult {
    let config = load_config()?;
    let client = signed_in_client(&config).await?;
    let chat = Chat::resume(&client, chat_id, ChatOptions::default()).await?;

    let messages = chat.get_messages().await?;
    if messages.is_empty() {
        println!("No messages in chat {chat_id}.");
    }
    for message in &messages {
        println!("{}", format_message(message));
    }
    Ok(())
}
