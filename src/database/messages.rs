//! Message database operations (the persisted transcript store)
//!
//! Messages are scoped to a room and ordered by their autoincrement id.
//! Bulk deletion is regeneration-group aware: alternates of a deleted
//! turn go with it even when their ids fall outside the deleted range.

use chrono::{DateTime, Utc};

use super::models::{ChatRole, MessageRecord, SavedChat};
use super::Database;

/// Errors from transcript mutations that are not plain storage failures.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    /// User-authored turns are immutable once sent.
    #[error("user messages cannot be edited")]
    NotEditable,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Extension trait for message-related database operations
pub trait MessageOps {
    /// Append a new turn. Sets `is_main = true`, no regeneration group,
    /// and bumps the room's `updated_at`.
    fn append_message(
        &self,
        room_id: &str,
        content: &str,
        role: ChatRole,
    ) -> impl std::future::Future<Output = Result<MessageRecord, sqlx::Error>> + Send;

    /// Append a turn restored from a saved snapshot, preserving its
    /// original role, canonical flag, group, and timestamp.
    fn append_saved_message(
        &self,
        room_id: &str,
        saved: &SavedChat,
    ) -> impl std::future::Future<Output = Result<MessageRecord, sqlx::Error>> + Send;

    fn get_message(
        &self,
        room_id: &str,
        message_id: i64,
    ) -> impl std::future::Future<Output = Result<Option<MessageRecord>, sqlx::Error>> + Send;

    /// Full transcript in creation order.
    fn list_messages(
        &self,
        room_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;

    /// Up to `limit` most-recent messages, newest first, optionally
    /// restricted to those created strictly before `before`.
    fn recent_messages(
        &self,
        room_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> impl std::future::Future<Output = Result<Vec<MessageRecord>, sqlx::Error>> + Send;

    fn last_message(
        &self,
        room_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<MessageRecord>, sqlx::Error>> + Send;

    fn last_user_message(
        &self,
        room_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<MessageRecord>, sqlx::Error>> + Send;

    /// Overwrite a message's content in place. Fails with
    /// [`TranscriptError::NotEditable`] for user-authored turns.
    fn update_message_content(
        &self,
        message: &MessageRecord,
        new_content: &str,
    ) -> impl std::future::Future<Output = Result<MessageRecord, TranscriptError>> + Send;

    /// Assign a regeneration group to an existing message.
    fn set_regeneration_group(
        &self,
        message_id: i64,
        group: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Unset `is_main` on every member of a group.
    fn clear_main_in_group(
        &self,
        room_id: &str,
        group: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Mark one message canonical within its group, unmarking the rest.
    fn set_main_message(
        &self,
        room_id: &str,
        message_id: i64,
        group: &str,
    ) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Delete `target`, every later message in the room, and every
    /// member of `target`'s regeneration group. Returns the count.
    fn delete_from_message(
        &self,
        room_id: &str,
        target: &MessageRecord,
    ) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;

    /// Wipe the room's transcript. Returns the count.
    fn delete_all_messages(
        &self,
        room_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, sqlx::Error>> + Send;

    fn count_messages(
        &self,
        room_id: &str,
    ) -> impl std::future::Future<Output = Result<i64, sqlx::Error>> + Send;
}

impl MessageOps for Database {
    async fn append_message(
        &self,
        room_id: &str,
        content: &str,
        role: ChatRole,
    ) -> Result<MessageRecord, sqlx::Error> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO messages (room_id, content, role, is_main, regeneration_group, created_at, updated_at)
            VALUES (?, ?, ?, 1, NULL, ?, ?)
            "#,
        )
        .bind(room_id)
        .bind(content)
        .bind(role.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();

        sqlx::query("UPDATE rooms SET updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;

        let message = sqlx::query_as::<_, MessageRecord>("SELECT * FROM messages WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn append_saved_message(
        &self,
        room_id: &str,
        saved: &SavedChat,
    ) -> Result<MessageRecord, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (room_id, content, role, is_main, regeneration_group, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(room_id)
        .bind(&saved.content)
        .bind(ChatRole::parse(&saved.role).as_str())
        .bind(saved.is_main)
        .bind(&saved.regeneration_group)
        .bind(saved.timestamp)
        .bind(saved.timestamp)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, MessageRecord>("SELECT * FROM messages WHERE id = ?")
            .bind(result.last_insert_rowid())
            .fetch_one(self.pool())
            .await
    }

    async fn get_message(
        &self,
        room_id: &str,
        message_id: i64,
    ) -> Result<Option<MessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, MessageRecord>("SELECT * FROM messages WHERE id = ? AND room_id = ?")
            .bind(message_id)
            .bind(room_id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<MessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages WHERE room_id = ? ORDER BY id ASC",
        )
        .bind(room_id)
        .fetch_all(self.pool())
        .await
    }

    async fn recent_messages(
        &self,
        room_id: &str,
        limit: u32,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageRecord>, sqlx::Error> {
        match before {
            Some(cutoff) => {
                sqlx::query_as::<_, MessageRecord>(
                    r#"
                    SELECT * FROM messages
                    WHERE room_id = ? AND created_at < ?
                    ORDER BY id DESC LIMIT ?
                    "#,
                )
                .bind(room_id)
                .bind(cutoff)
                .bind(limit as i64)
                .fetch_all(self.pool())
                .await
            }
            None => {
                sqlx::query_as::<_, MessageRecord>(
                    "SELECT * FROM messages WHERE room_id = ? ORDER BY id DESC LIMIT ?",
                )
                .bind(room_id)
                .bind(limit as i64)
                .fetch_all(self.pool())
                .await
            }
        }
    }

    async fn last_message(&self, room_id: &str) -> Result<Option<MessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages WHERE room_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(self.pool())
        .await
    }

    async fn last_user_message(&self, room_id: &str) -> Result<Option<MessageRecord>, sqlx::Error> {
        sqlx::query_as::<_, MessageRecord>(
            "SELECT * FROM messages WHERE room_id = ? AND role = 'user' ORDER BY id DESC LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(self.pool())
        .await
    }

    async fn update_message_content(
        &self,
        message: &MessageRecord,
        new_content: &str,
    ) -> Result<MessageRecord, TranscriptError> {
        if message.role() == ChatRole::User {
            return Err(TranscriptError::NotEditable);
        }

        sqlx::query("UPDATE messages SET content = ?, updated_at = ? WHERE id = ?")
            .bind(new_content)
            .bind(Utc::now())
            .bind(message.id)
            .execute(self.pool())
            .await?;

        let updated = sqlx::query_as::<_, MessageRecord>("SELECT * FROM messages WHERE id = ?")
            .bind(message.id)
            .fetch_one(self.pool())
            .await?;

        Ok(updated)
    }

    async fn set_regeneration_group(&self, message_id: i64, group: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE messages SET regeneration_group = ? WHERE id = ?")
            .bind(group)
            .bind(message_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn clear_main_in_group(&self, room_id: &str, group: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE messages SET is_main = 0 WHERE room_id = ? AND regeneration_group = ?",
        )
        .bind(room_id)
        .bind(group)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn set_main_message(
        &self,
        room_id: &str,
        message_id: i64,
        group: &str,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "UPDATE messages SET is_main = 0 WHERE room_id = ? AND regeneration_group = ? AND id != ?",
        )
        .bind(room_id)
        .bind(group)
        .bind(message_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE messages SET is_main = 1 WHERE id = ?")
            .bind(message_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_from_message(
        &self,
        room_id: &str,
        target: &MessageRecord,
    ) -> Result<u64, sqlx::Error> {
        let result = match &target.regeneration_group {
            Some(group) => {
                sqlx::query(
                    "DELETE FROM messages WHERE room_id = ? AND (id >= ? OR regeneration_group = ?)",
                )
                .bind(room_id)
                .bind(target.id)
                .bind(group)
                .execute(self.pool())
                .await?
            }
            None => {
                sqlx::query("DELETE FROM messages WHERE room_id = ? AND id >= ?")
                    .bind(room_id)
                    .bind(target.id)
                    .execute(self.pool())
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn delete_all_messages(&self, room_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM messages WHERE room_id = ?")
            .bind(room_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_messages(&self, room_id: &str) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}
