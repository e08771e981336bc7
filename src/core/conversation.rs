//! Conversation Orchestrator
//!
//! The stateful protocol binding rooms, the transcript store, the memory
//! window, the prompt composer, and the LLM provider into user-facing
//! operations. Every operation takes the acting user explicitly and
//! checks room ownership before touching the transcript.
//!
//! Failure policy: an LLM failure during an ordinary send is downgraded
//! to a fixed apology that is persisted like any other AI turn, so the
//! conversation is never left stuck. Regenerate and suggest are explicit
//! retries where silent degradation would confuse the user, so there the
//! same failure surfaces as an upstream error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use crate::core::llm::{ChatMessage, ChatRequest, LLMError, LLMProvider};
use crate::core::memory;
use crate::core::prompt;
use crate::database::models::{
    CharacterRecord, ChatRole, ConversationHistoryRecord, MessageRecord, RoomRecord, SavedChat,
};
use crate::database::{
    CharacterOps, Database, HistoryOps, MessageOps, RoomOps, TranscriptError,
};

/// Persisted in place of the AI turn when the upstream call fails
/// during an ordinary send.
pub const FALLBACK_AI_RESPONSE: &str = "I'm sorry, I can't come up with a reply right now.";

/// Placeholder shown for rooms with no messages yet.
pub const EMPTY_ROOM_PREVIEW: &str = "Start the conversation!";

const MAX_MESSAGE_LEN: usize = 1000;
const MAX_TITLE_LEN: usize = 100;

// ============================================================================
// Error Taxonomy
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    /// Resource absent, or not addressable by this user.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Ownership mismatch. Deliberately generic: the message must not
    /// reveal whether the resource exists.
    #[error("you do not have access to this resource")]
    Forbidden,

    /// Attempt to mutate an immutable user-authored turn.
    #[error("user messages cannot be edited")]
    NotEditable,

    #[error("{0}")]
    InvalidRequest(String),

    /// Character mismatch between a room and a saved history.
    #[error("the room's character does not match the history's character")]
    Conflict {
        room_character: String,
        history_character: String,
    },

    #[error("response generation failed")]
    Upstream(#[source] LLMError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<TranscriptError> for ConversationError {
    fn from(err: TranscriptError) -> Self {
        match err {
            TranscriptError::NotEditable => ConversationError::NotEditable,
            TranscriptError::Database(e) => ConversationError::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConversationError>;

// ============================================================================
// Settings & Outcomes
// ============================================================================

/// Generation parameters the orchestrator applies to every LLM call.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Maximum number of prior turns in the memory window.
    pub history_limit: u32,
    /// Number of reply suggestions generated per request.
    pub suggestion_count: u32,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            suggestion_count: 3,
            temperature: 0.8,
            max_output_tokens: 1024,
        }
    }
}

/// Room list entry with character identity and a last-message preview.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room: RoomRecord,
    pub character_name: String,
    pub character_title: String,
    pub last_message: String,
}

/// Full room view: metadata plus the ordered transcript.
#[derive(Debug, Clone)]
pub struct RoomDetail {
    pub room: RoomRecord,
    pub character_name: String,
    pub character_title: String,
    pub messages: Vec<MessageRecord>,
}

/// Result of a send: the echoed input and the persisted AI turn.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub room_id: String,
    pub user_id: String,
    pub character_name: String,
    pub user_message: String,
    pub ai_message: MessageRecord,
}

/// Result of a regenerate: the new alternate and its group.
#[derive(Debug, Clone)]
pub struct RegenerateOutcome {
    pub room_id: String,
    pub character_name: String,
    pub response: String,
    pub regeneration_group: String,
    pub created_at: DateTime<Utc>,
}

/// Result of saving a history snapshot.
#[derive(Debug, Clone)]
pub struct SaveHistoryOutcome {
    pub history_id: String,
    pub title: String,
    pub saved_chats: usize,
}

/// Result of restoring a history snapshot into a room.
#[derive(Debug, Clone)]
pub struct LoadHistoryOutcome {
    pub deleted_count: u64,
    pub loaded_count: usize,
    pub history_title: String,
}

// ============================================================================
// Service
// ============================================================================

/// Orchestrates all conversation operations for one provider + store.
pub struct ConversationService {
    db: Database,
    provider: Arc<dyn LLMProvider>,
    settings: ChatSettings,
}

impl ConversationService {
    pub fn new(db: Database, provider: Arc<dyn LLMProvider>, settings: ChatSettings) -> Self {
        Self {
            db,
            provider,
            settings,
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Look up a room and enforce ownership.
    async fn resolve_room(&self, room_id: &str, user_id: &str) -> Result<RoomRecord> {
        let room = self
            .db
            .get_room(room_id)
            .await?
            .ok_or(ConversationError::NotFound("room"))?;

        if room.user_id != user_id {
            return Err(ConversationError::Forbidden);
        }

        Ok(room)
    }

    async fn character_for(&self, room: &RoomRecord) -> Result<CharacterRecord> {
        self.db
            .get_character(&room.character_id)
            .await?
            .ok_or(ConversationError::NotFound("character"))
    }

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    /// Idempotent room creation. The bool is true when a new room was
    /// created, false when the existing one was returned.
    pub async fn create_room(&self, user_id: &str, character_id: &str) -> Result<(RoomRecord, bool)> {
        let character = self
            .db
            .get_character(character_id)
            .await?
            .ok_or_else(|| ConversationError::InvalidRequest("unknown character_id".to_string()))?;

        let (room, created) = self.db.get_or_create_room(user_id, &character.id).await?;
        if created {
            info!(room_id = %room.id, character = %character.name, "Room created");
        }
        Ok((room, created))
    }

    /// Rooms for a user: pinned first, then most recently updated.
    pub async fn list_rooms(&self, user_id: &str) -> Result<Vec<RoomSummary>> {
        let rooms = self.db.list_rooms(user_id).await?;

        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let character = self.character_for(&room).await?;
            let last_message = self
                .db
                .last_message(&room.id)
                .await?
                .map(|m| m.content)
                .unwrap_or_else(|| EMPTY_ROOM_PREVIEW.to_string());

            summaries.push(RoomSummary {
                room,
                character_name: character.name,
                character_title: character.title,
                last_message,
            });
        }
        Ok(summaries)
    }

    pub async fn room_detail(&self, user_id: &str, room_id: &str) -> Result<RoomDetail> {
        let room = self.resolve_room(room_id, user_id).await?;
        let character = self.character_for(&room).await?;
        let messages = self.db.list_messages(&room.id).await?;

        Ok(RoomDetail {
            room,
            character_name: character.name,
            character_title: character.title,
            messages,
        })
    }

    pub async fn toggle_fixation(&self, user_id: &str, room_id: &str) -> Result<RoomRecord> {
        let room = self.resolve_room(room_id, user_id).await?;
        self.db
            .toggle_fixation(&room.id)
            .await?
            .ok_or(ConversationError::NotFound("room"))
    }

    pub async fn leave_room(&self, user_id: &str, room_id: &str) -> Result<()> {
        let room = self.resolve_room(room_id, user_id).await?;
        self.db.delete_room(&room.id).await?;
        info!(room_id = %room.id, "Room deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Send a turn. An empty `user_message` means "continue unprompted":
    /// no user turn is persisted and the model is invoked on the window
    /// alone. An upstream failure is downgraded to a persisted apology.
    pub async fn send(&self, user_id: &str, room_id: &str, user_message: &str) -> Result<SendOutcome> {
        if user_message.chars().count() > MAX_MESSAGE_LEN {
            return Err(ConversationError::InvalidRequest(format!(
                "message exceeds {} characters",
                MAX_MESSAGE_LEN
            )));
        }

        let room = self.resolve_room(room_id, user_id).await?;
        let character = self.character_for(&room).await?;

        if !user_message.is_empty() {
            self.db
                .append_message(&room.id, user_message, ChatRole::User)
                .await?;
        }

        let window = memory::build_window(&self.db, &room.id, self.settings.history_limit, None).await?;

        let ai_text = match self.invoke(&character, window, user_message).await {
            Ok(text) => text,
            Err(err) => {
                error!(room_id = %room.id, error = %err, "LLM call failed; persisting fallback response");
                FALLBACK_AI_RESPONSE.to_string()
            }
        };

        let ai_message = self.db.append_message(&room.id, &ai_text, ChatRole::Ai).await?;

        Ok(SendOutcome {
            room_id: room.id,
            user_id: room.user_id,
            character_name: character.name,
            user_message: user_message.to_string(),
            ai_message,
        })
    }

    /// Overwrite an AI turn's content. User turns are immutable.
    pub async fn edit_message(
        &self,
        user_id: &str,
        room_id: &str,
        message_id: i64,
        new_content: &str,
    ) -> Result<MessageRecord> {
        if new_content.is_empty() || new_content.chars().count() > MAX_MESSAGE_LEN {
            return Err(ConversationError::InvalidRequest(
                "message must be 1 to 1000 characters".to_string(),
            ));
        }

        let room = self.resolve_room(room_id, user_id).await?;
        let message = self
            .db
            .get_message(&room.id, message_id)
            .await?
            .ok_or(ConversationError::NotFound("message"))?;

        Ok(self.db.update_message_content(&message, new_content).await?)
    }

    /// Mark one member of a regeneration group as the displayed message.
    pub async fn mark_main(&self, user_id: &str, room_id: &str, message_id: i64) -> Result<MessageRecord> {
        let room = self.resolve_room(room_id, user_id).await?;
        let message = self
            .db
            .get_message(&room.id, message_id)
            .await?
            .ok_or(ConversationError::NotFound("message"))?;

        let group = message.regeneration_group.clone().ok_or_else(|| {
            ConversationError::InvalidRequest(
                "cannot change is_main on a message that was never regenerated".to_string(),
            )
        })?;

        self.db.set_main_message(&room.id, message.id, &group).await?;

        self.db
            .get_message(&room.id, message.id)
            .await?
            .ok_or(ConversationError::NotFound("message"))
    }

    /// Delete from a message to the end of the room, plus all of its
    /// regeneration alternates. Returns the number of rows removed.
    pub async fn delete_from(&self, user_id: &str, room_id: &str, message_id: i64) -> Result<u64> {
        let room = self.resolve_room(room_id, user_id).await?;
        let target = self
            .db
            .get_message(&room.id, message_id)
            .await?
            .ok_or(ConversationError::NotFound("message"))?;

        let deleted = self.db.delete_from_message(&room.id, &target).await?;
        info!(room_id = %room.id, from = message_id, deleted, "Transcript range deleted");
        Ok(deleted)
    }

    /// Regenerate the response to the last user turn. The new alternate
    /// joins (or founds) the regeneration group and becomes canonical.
    pub async fn regenerate(&self, user_id: &str, room_id: &str) -> Result<RegenerateOutcome> {
        let room = self.resolve_room(room_id, user_id).await?;
        let character = self.character_for(&room).await?;

        let last_message = self
            .db
            .last_message(&room.id)
            .await?
            .ok_or(ConversationError::NotFound("message"))?;

        if last_message.role() == ChatRole::User {
            return Err(ConversationError::InvalidRequest(
                "the most recent message is a user message; nothing to regenerate".to_string(),
            ));
        }

        let last_user = self
            .db
            .last_user_message(&room.id)
            .await?
            .ok_or(ConversationError::NotFound("user message"))?;

        // Window as of the user's last turn, so the responses being
        // replaced fall outside the memory.
        let window = memory::build_window(
            &self.db,
            &room.id,
            self.settings.history_limit,
            Some(last_user.created_at),
        )
        .await?;

        let response = self
            .invoke(&character, window, &last_user.content)
            .await
            .map_err(ConversationError::Upstream)?;

        let group = match &last_message.regeneration_group {
            Some(group) => group.clone(),
            None => {
                let group = Uuid::new_v4().to_string();
                self.db.set_regeneration_group(last_message.id, &group).await?;
                group
            }
        };

        self.db.clear_main_in_group(&room.id, &group).await?;

        let ai_message = self.db.append_message(&room.id, &response, ChatRole::Ai).await?;
        self.db.set_regeneration_group(ai_message.id, &group).await?;

        info!(room_id = %room.id, group = %group, "Response regenerated");

        Ok(RegenerateOutcome {
            room_id: room.id,
            character_name: character.name,
            response,
            regeneration_group: group,
            created_at: ai_message.created_at,
        })
    }

    /// Generate reply suggestions for the user's next turn. Each
    /// suggestion is a separate LLM call; failures surface to the
    /// caller rather than producing a degraded suggestion.
    pub async fn suggest(&self, user_id: &str, room_id: &str) -> Result<Vec<String>> {
        let room = self.resolve_room(room_id, user_id).await?;
        let character = self.character_for(&room).await?;

        let window = memory::build_window(&self.db, &room.id, self.settings.history_limit, None).await?;
        if window.is_empty() {
            return Err(ConversationError::InvalidRequest(
                "no conversation history to base suggestions on".to_string(),
            ));
        }

        let system = prompt::compose_suggestion_prompt(&character);

        let mut suggestions = Vec::with_capacity(self.settings.suggestion_count as usize);
        for _ in 0..self.settings.suggestion_count {
            let mut messages = window.clone();
            messages.push(ChatMessage::user(prompt::SUGGESTION_INPUT));

            let request = ChatRequest::new(messages)
                .with_system(system.clone())
                .with_temperature(self.settings.temperature)
                .with_max_tokens(self.settings.max_output_tokens);

            let response = self
                .provider
                .chat(request)
                .await
                .map_err(ConversationError::Upstream)?;
            suggestions.push(response.content.trim().to_string());
        }

        Ok(suggestions)
    }

    // ------------------------------------------------------------------
    // Histories
    // ------------------------------------------------------------------

    /// Snapshot the room's transcript under a title.
    pub async fn save_history(&self, user_id: &str, room_id: &str, title: &str) -> Result<SaveHistoryOutcome> {
        validate_title(title)?;

        let room = self.resolve_room(room_id, user_id).await?;
        let messages = self.db.list_messages(&room.id).await?;

        if messages.is_empty() {
            return Err(ConversationError::InvalidRequest(
                "no conversation history to save".to_string(),
            ));
        }

        let entries: Vec<SavedChat> = messages
            .iter()
            .map(|m| SavedChat {
                content: m.content.clone(),
                role: m.role.clone(),
                is_main: m.is_main,
                regeneration_group: m.regeneration_group.clone(),
                timestamp: m.created_at,
            })
            .collect();

        let record = ConversationHistoryRecord::new(user_id, &room.character_id, title, &entries)
            .map_err(|e| ConversationError::InvalidRequest(format!("unserializable transcript: {e}")))?;

        self.db.save_history(&record).await?;

        info!(history_id = %record.id, chats = entries.len(), "Conversation history saved");

        Ok(SaveHistoryOutcome {
            history_id: record.id,
            title: record.title,
            saved_chats: entries.len(),
        })
    }

    /// Saved histories for the room's character, newest first.
    pub async fn list_histories(&self, user_id: &str, room_id: &str) -> Result<Vec<ConversationHistoryRecord>> {
        let room = self.resolve_room(room_id, user_id).await?;
        Ok(self.db.list_histories(user_id, &room.character_id).await?)
    }

    pub async fn history_detail(&self, user_id: &str, history_id: &str) -> Result<ConversationHistoryRecord> {
        self.db
            .get_history(history_id, user_id)
            .await?
            .ok_or(ConversationError::NotFound("history"))
    }

    pub async fn rename_history(&self, user_id: &str, history_id: &str, title: &str) -> Result<ConversationHistoryRecord> {
        validate_title(title)?;
        let history = self.history_detail(user_id, history_id).await?;
        self.db.rename_history(&history.id, title).await?;
        self.history_detail(user_id, history_id).await
    }

    pub async fn delete_history(&self, user_id: &str, history_id: &str) -> Result<()> {
        let history = self.history_detail(user_id, history_id).await?;
        self.db.delete_history(&history.id).await?;
        Ok(())
    }

    /// Destructively replace the room's transcript with a saved
    /// snapshot. Rejected before any deletion when the history belongs
    /// to a different character.
    pub async fn load_history(&self, user_id: &str, room_id: &str, history_id: &str) -> Result<LoadHistoryOutcome> {
        let room = self.resolve_room(room_id, user_id).await?;
        let history = self.history_detail(user_id, history_id).await?;

        if room.character_id != history.character_id {
            let room_character = self.character_for(&room).await?;
            let history_character = self
                .db
                .get_character(&history.character_id)
                .await?
                .map(|c| c.name)
                .unwrap_or_default();

            return Err(ConversationError::Conflict {
                room_character: room_character.name,
                history_character,
            });
        }

        let deleted_count = self.db.delete_all_messages(&room.id).await?;

        let entries = history.entries();
        for entry in &entries {
            self.db.append_saved_message(&room.id, entry).await?;
        }

        info!(
            room_id = %room.id,
            history_id = %history.id,
            deleted_count,
            loaded_count = entries.len(),
            "Conversation history restored"
        );

        Ok(LoadHistoryOutcome {
            deleted_count,
            loaded_count: entries.len(),
            history_title: history.title,
        })
    }

    // ------------------------------------------------------------------
    // LLM invocation
    // ------------------------------------------------------------------

    /// One role-play completion: persona system prompt, memory window,
    /// and the fresh input as the final user turn.
    async fn invoke(
        &self,
        character: &CharacterRecord,
        window: Vec<ChatMessage>,
        input: &str,
    ) -> std::result::Result<String, LLMError> {
        let system = prompt::compose_system_prompt(character);

        let mut messages = window;
        messages.push(ChatMessage::user(input));

        let request = ChatRequest::new(messages)
            .with_system(system)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(self.settings.max_output_tokens);

        let response = self.provider.chat(request).await?;
        Ok(response.content.trim().to_string())
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(ConversationError::InvalidRequest(
            "title must be 1 to 100 characters".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// Relative time labels
// ============================================================================

/// Human label for when a history was saved: "just now" under a minute,
/// minutes under an hour, hours under a day, else the calendar date.
pub fn saved_date_label(saved_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(saved_at);

    if elapsed.num_minutes() < 1 {
        "just now".to_string()
    } else if elapsed.num_hours() < 1 {
        format!("{} minutes ago", elapsed.num_minutes())
    } else if elapsed.num_days() < 1 {
        format!("{} hours ago", elapsed.num_hours())
    } else {
        saved_at.format("%Y-%m-%d").to_string()
    }
}
