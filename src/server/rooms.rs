//! Room, Message, and History Handlers
//!
//! One handler per operation on the `/rooms` surface. Request and
//! response bodies are explicit serde structs; records never leak
//! straight out of the database layer.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::conversation::saved_date_label;
use crate::database::models::{ConversationHistoryRecord, MessageRecord};
use crate::server::auth::AuthUser;
use crate::server::error::ApiError;
use crate::server::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub character_id: String,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub character_id: String,
    pub fixation: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CharacterSummary {
    pub id: String,
    pub name: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct RoomListEntry {
    pub id: String,
    pub character: CharacterSummary,
    pub last_message: String,
    pub fixation: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub content: String,
    pub role: String,
    pub is_main: bool,
    pub regeneration_group: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for MessageResponse {
    fn from(m: MessageRecord) -> Self {
        Self {
            id: m.id,
            content: m.content,
            role: m.role,
            is_main: m.is_main,
            regeneration_group: m.regeneration_group,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomDetailResponse {
    pub id: String,
    pub character: CharacterSummary,
    pub fixation: bool,
    pub messages: Vec<MessageResponse>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Empty or omitted means "continue unprompted".
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub room_id: String,
    pub character_name: String,
    pub user_message: String,
    pub ai_message: MessageResponse,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteFromResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RegenerateResponse {
    pub room_id: String,
    pub character_name: String,
    pub response: String,
    pub regeneration_group: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryTitleRequest {
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListEntry {
    pub id: String,
    pub title: String,
    pub last_message: String,
    pub saved_at: DateTime<Utc>,
    /// Relative label: "just now", "5 minutes ago", "3 hours ago",
    /// or the calendar date.
    pub saved_date: String,
}

impl HistoryListEntry {
    fn from_record(record: ConversationHistoryRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            last_message: record.last_message,
            saved_at: record.saved_at,
            saved_date: saved_date_label(record.saved_at, now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveHistoryResponse {
    pub id: String,
    pub title: String,
    pub saved_chats: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryDetailResponse {
    pub id: String,
    pub title: String,
    pub character_id: String,
    pub saved_at: DateTime<Utc>,
    pub chats: Vec<SavedChatResponse>,
}

#[derive(Debug, Serialize)]
pub struct SavedChatResponse {
    pub content: String,
    pub role: String,
    pub is_main: bool,
    pub regeneration_group: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HistoryDetailResponse {
    fn from_record(record: ConversationHistoryRecord) -> Self {
        let chats = record
            .entries()
            .into_iter()
            .map(|c| SavedChatResponse {
                content: c.content,
                role: c.role,
                is_main: c.is_main,
                regeneration_group: c.regeneration_group,
                timestamp: c.timestamp,
            })
            .collect();

        Self {
            id: record.id,
            title: record.title,
            character_id: record.character_id,
            saved_at: record.saved_at,
            chats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoadHistoryResponse {
    pub deleted_count: u64,
    pub loaded_count: usize,
    pub history_title: String,
}

// ============================================================================
// Room handlers
// ============================================================================

pub async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<RoomListEntry>>, ApiError> {
    let summaries = state.service.list_rooms(&user.id).await?;

    let entries = summaries
        .into_iter()
        .map(|s| RoomListEntry {
            id: s.room.id,
            character: CharacterSummary {
                id: s.room.character_id,
                name: s.character_name,
                title: s.character_title,
            },
            last_message: s.last_message,
            fixation: s.room.fixation,
            updated_at: s.room.updated_at,
        })
        .collect();

    Ok(Json(entries))
}

pub async fn create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Response, ApiError> {
    let (room, created) = state.service.create_room(&user.id, &body.character_id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    let body = RoomResponse {
        id: room.id,
        character_id: room.character_id,
        fixation: room.fixation,
        created_at: room.created_at,
        updated_at: room.updated_at,
    };

    Ok((status, Json(body)).into_response())
}

pub async fn room_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailResponse>, ApiError> {
    let detail = state.service.room_detail(&user.id, &room_id).await?;

    Ok(Json(RoomDetailResponse {
        id: detail.room.id,
        character: CharacterSummary {
            id: detail.room.character_id,
            name: detail.character_name,
            title: detail.character_title,
        },
        fixation: detail.room.fixation,
        messages: detail.messages.into_iter().map(Into::into).collect(),
    }))
}

pub async fn toggle_fixation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = state.service.toggle_fixation(&user.id, &room_id).await?;

    Ok(Json(RoomResponse {
        id: room.id,
        character_id: room.character_id,
        fixation: room.fixation,
        created_at: room.created_at,
        updated_at: room.updated_at,
    }))
}

pub async fn delete_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.leave_room(&user.id, &room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Message handlers
// ============================================================================

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let outcome = state.service.send(&user.id, &room_id, &body.message).await?;

    Ok(Json(SendMessageResponse {
        room_id: outcome.room_id,
        character_name: outcome.character_name,
        user_message: outcome.user_message,
        ai_message: outcome.ai_message.into(),
    }))
}

pub async fn edit_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path((room_id, message_id)): Path<(String, i64)>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state
        .service
        .edit_message(&user.id, &room_id, message_id, &body.message)
        .await?;
    Ok(Json(message.into()))
}

pub async fn mark_main(
    State(state): State<AppState>,
    user: AuthUser,
    Path((room_id, message_id)): Path<(String, i64)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state.service.mark_main(&user.id, &room_id, message_id).await?;
    Ok(Json(message.into()))
}

pub async fn delete_from_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path((room_id, message_id)): Path<(String, i64)>,
) -> Result<Json<DeleteFromResponse>, ApiError> {
    let deleted_count = state
        .service
        .delete_from(&user.id, &room_id, message_id)
        .await?;
    Ok(Json(DeleteFromResponse { deleted_count }))
}

pub async fn suggestions(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let suggestions = state.service.suggest(&user.id, &room_id).await?;
    Ok(Json(SuggestionsResponse { suggestions }))
}

pub async fn regenerate(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<RegenerateResponse>, ApiError> {
    let outcome = state.service.regenerate(&user.id, &room_id).await?;

    Ok(Json(RegenerateResponse {
        room_id: outcome.room_id,
        character_name: outcome.character_name,
        response: outcome.response,
        regeneration_group: outcome.regeneration_group,
        created_at: outcome.created_at,
    }))
}

// ============================================================================
// History handlers
// ============================================================================

pub async fn list_histories(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<HistoryListEntry>>, ApiError> {
    let records = state.service.list_histories(&user.id, &room_id).await?;

    let now = Utc::now();
    let entries = records
        .into_iter()
        .map(|r| HistoryListEntry::from_record(r, now))
        .collect();

    Ok(Json(entries))
}

pub async fn save_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<String>,
    Json(body): Json<HistoryTitleRequest>,
) -> Result<Json<SaveHistoryResponse>, ApiError> {
    let outcome = state
        .service
        .save_history(&user.id, &room_id, &body.title)
        .await?;

    Ok(Json(SaveHistoryResponse {
        id: outcome.history_id,
        title: outcome.title,
        saved_chats: outcome.saved_chats,
    }))
}

pub async fn history_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path((_room_id, history_id)): Path<(String, String)>,
) -> Result<Json<HistoryDetailResponse>, ApiError> {
    let record = state.service.history_detail(&user.id, &history_id).await?;
    Ok(Json(HistoryDetailResponse::from_record(record)))
}

pub async fn rename_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path((_room_id, history_id)): Path<(String, String)>,
    Json(body): Json<HistoryTitleRequest>,
) -> Result<Json<HistoryDetailResponse>, ApiError> {
    let record = state
        .service
        .rename_history(&user.id, &history_id, &body.title)
        .await?;
    Ok(Json(HistoryDetailResponse::from_record(record)))
}

pub async fn delete_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path((_room_id, history_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_history(&user.id, &history_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn load_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path((room_id, history_id)): Path<(String, String)>,
) -> Result<Json<LoadHistoryResponse>, ApiError> {
    let outcome = state
        .service
        .load_history(&user.id, &room_id, &history_id)
        .await?;

    Ok(Json(LoadHistoryResponse {
        deleted_count: outcome.deleted_count,
        loaded_count: outcome.loaded_count,
        history_title: outcome.history_title,
    }))
}
