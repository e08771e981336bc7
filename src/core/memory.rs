//! Memory Window Builder
//!
//! Converts persisted transcript rows into the bounded conversational
//! context fed to the LLM. Truncation happens at turn granularity only:
//! the window holds at most `limit` whole messages, never a partial one.

use chrono::{DateTime, Utc};

use crate::core::llm::{ChatMessage, MessageRole};
use crate::database::models::{ChatRole, MessageRecord};
use crate::database::{Database, MessageOps};

/// Build the memory window for a room: up to `limit` most-recent
/// messages in chronological order, classified into user/assistant
/// roles. `before` restricts the window to messages created strictly
/// earlier; regenerate passes the last user message's timestamp here so
/// the responses being replaced fall outside the window.
pub async fn build_window(
    db: &Database,
    room_id: &str,
    limit: u32,
    before: Option<DateTime<Utc>>,
) -> Result<Vec<ChatMessage>, sqlx::Error> {
    let recent = db.recent_messages(room_id, limit, before).await?;
    Ok(to_context(recent))
}

/// Reverse a newest-first slice into chronological order and map store
/// roles onto LLM roles.
fn to_context(mut newest_first: Vec<MessageRecord>) -> Vec<ChatMessage> {
    newest_first.reverse();
    newest_first
        .into_iter()
        .map(|record| {
            let role = match record.role() {
                ChatRole::User => MessageRole::User,
                ChatRole::Ai => MessageRole::Assistant,
            };
            ChatMessage {
                role,
                content: record.content,
            }
        })
        .collect()
}
