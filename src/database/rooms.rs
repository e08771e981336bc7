//! Room database operations

use super::models::RoomRecord;
use super::Database;

/// Extension trait for room-related database operations
pub trait RoomOps {
    /// Idempotent create: returns the existing room for (user, character)
    /// or inserts a new one. The bool is true when a row was created.
    fn get_or_create_room(
        &self,
        user_id: &str,
        character_id: &str,
    ) -> impl std::future::Future<Output = Result<(RoomRecord, bool), sqlx::Error>> + Send;

    fn get_room(&self, id: &str) -> impl std::future::Future<Output = Result<Option<RoomRecord>, sqlx::Error>> + Send;
    fn list_rooms(&self, user_id: &str) -> impl std::future::Future<Output = Result<Vec<RoomRecord>, sqlx::Error>> + Send;
    fn toggle_fixation(&self, id: &str) -> impl std::future::Future<Output = Result<Option<RoomRecord>, sqlx::Error>> + Send;
    fn delete_room(&self, id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
}

impl RoomOps for Database {
    async fn get_or_create_room(
        &self,
        user_id: &str,
        character_id: &str,
    ) -> Result<(RoomRecord, bool), sqlx::Error> {
        let room = RoomRecord::new(user_id, character_id);

        // UNIQUE(user_id, character_id) makes this race-safe under
        // concurrent first-message sends.
        let result = sqlx::query(
            r#"
            INSERT INTO rooms (id, user_id, character_id, fixation, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, character_id) DO NOTHING
            "#,
        )
        .bind(&room.id)
        .bind(&room.user_id)
        .bind(&room.character_id)
        .bind(room.fixation)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(self.pool())
        .await?;

        let created = result.rows_affected() > 0;

        let room = sqlx::query_as::<_, RoomRecord>(
            "SELECT * FROM rooms WHERE user_id = ? AND character_id = ?",
        )
        .bind(user_id)
        .bind(character_id)
        .fetch_one(self.pool())
        .await?;

        Ok((room, created))
    }

    async fn get_room(&self, id: &str) -> Result<Option<RoomRecord>, sqlx::Error> {
        sqlx::query_as::<_, RoomRecord>("SELECT * FROM rooms WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn list_rooms(&self, user_id: &str) -> Result<Vec<RoomRecord>, sqlx::Error> {
        sqlx::query_as::<_, RoomRecord>(
            "SELECT * FROM rooms WHERE user_id = ? ORDER BY fixation DESC, updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
    }

    async fn toggle_fixation(&self, id: &str) -> Result<Option<RoomRecord>, sqlx::Error> {
        sqlx::query("UPDATE rooms SET fixation = NOT fixation WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        self.get_room(id).await
    }

    async fn delete_room(&self, id: &str) -> Result<(), sqlx::Error> {
        // Messages cascade via the room_id foreign key.
        sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
