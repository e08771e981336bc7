//! Database Records
//!
//! Row types for users, characters, rooms, messages, auth tokens, and
//! saved conversation histories. Timestamps are UTC and stored as TEXT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Message Role
// ============================================================================

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Ai => "ai",
        }
    }

    /// Parse a stored role string. Unknown values map to `Ai` so a
    /// corrupted row renders as an assistant turn instead of failing.
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => ChatRole::User,
            _ => ChatRole::Ai,
        }
    }
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// User Record
// ============================================================================

/// Account record. Registration and profile management live in the
/// accounts service; this core only needs identity and a display name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Character Record
// ============================================================================

/// Persona definition consumed read-only by the conversation engine.
///
/// `intro` and `example_situation` hold loosely structured JSON authored
/// by users. They are parsed defensively at prompt-composition time;
/// malformed entries are skipped, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CharacterRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub title: String,
    /// JSON array of `{id, role, message}` fragments.
    pub intro: Option<String>,
    pub description: Option<String>,
    pub character_info: Option<String>,
    /// JSON list of lists of `{id, role, message}` fragments.
    pub example_situation: Option<String>,
    pub presentation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CharacterRecord {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            title: title.into(),
            intro: None,
            description: None,
            character_info: None,
            example_situation: None,
            presentation: None,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Room Record
// ============================================================================

/// One conversation thread between a user and a character.
/// At most one room exists per (user, character) pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoomRecord {
    pub id: String,
    pub user_id: String,
    pub character_id: String,
    /// Pinned rooms sort before unpinned in the room list.
    pub fixation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRecord {
    pub fn new(user_id: impl Into<String>, character_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            character_id: character_id.into(),
            fixation: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// ============================================================================
// Message Record
// ============================================================================

/// One persisted chat turn. `id` is assigned by the store and is the
/// ordering key within a room.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRecord {
    pub id: i64,
    pub room_id: String,
    pub content: String,
    pub role: String,
    /// Within a non-null regeneration group, exactly one message is main.
    pub is_main: bool,
    /// Shared by all alternates of one logical AI turn.
    pub regeneration_group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageRecord {
    pub fn role(&self) -> ChatRole {
        ChatRole::parse(&self.role)
    }
}

// ============================================================================
// Auth Token Record
// ============================================================================

/// Bearer credential issued by the external auth service. This core only
/// resolves tokens to users; issuance and revocation happen elsewhere.
#[derive(Debug, Clone, FromRow)]
pub struct AuthTokenRecord {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Conversation History Record
// ============================================================================

/// A named snapshot of a room's transcript, restorable later.
/// `chat_history` is the JSON-encoded list of [`SavedChat`] entries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationHistoryRecord {
    pub id: String,
    pub user_id: String,
    pub character_id: String,
    pub title: String,
    pub chat_history: String,
    /// Preview of the final turn at save time (first 50 chars).
    pub last_message: String,
    pub saved_at: DateTime<Utc>,
}

/// One transcript entry inside a saved history snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedChat {
    pub content: String,
    pub role: String,
    #[serde(default = "default_is_main")]
    pub is_main: bool,
    #[serde(default)]
    pub regeneration_group: Option<String>,
    pub timestamp: DateTime<Utc>,
}

fn default_is_main() -> bool {
    true
}

impl ConversationHistoryRecord {
    pub fn new(
        user_id: impl Into<String>,
        character_id: impl Into<String>,
        title: impl Into<String>,
        entries: &[SavedChat],
    ) -> Result<Self, serde_json::Error> {
        let last_message = entries
            .last()
            .map(|c| c.content.chars().take(50).collect())
            .unwrap_or_default();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            character_id: character_id.into(),
            title: title.into(),
            chat_history: serde_json::to_string(entries)?,
            last_message,
            saved_at: Utc::now(),
        })
    }

    /// Decode the snapshot entries. Entries that fail to decode are
    /// dropped rather than failing the whole snapshot.
    pub fn entries(&self) -> Vec<SavedChat> {
        match serde_json::from_str::<Vec<serde_json::Value>>(&self.chat_history) {
            Ok(values) => values
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}
