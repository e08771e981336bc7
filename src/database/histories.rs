//! Saved conversation snapshot operations
//!
//! Histories are scoped to (user, character), not to a room: a snapshot
//! saved from one room is loadable into any room of the same character.

use super::models::ConversationHistoryRecord;
use super::Database;

/// Extension trait for conversation-history database operations
pub trait HistoryOps {
    fn save_history(&self, history: &ConversationHistoryRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_history(&self, id: &str, user_id: &str) -> impl std::future::Future<Output = Result<Option<ConversationHistoryRecord>, sqlx::Error>> + Send;
    fn list_histories(&self, user_id: &str, character_id: &str) -> impl std::future::Future<Output = Result<Vec<ConversationHistoryRecord>, sqlx::Error>> + Send;
    fn rename_history(&self, id: &str, title: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_history(&self, id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
}

impl HistoryOps for Database {
    async fn save_history(&self, history: &ConversationHistoryRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO conversation_histories
            (id, user_id, character_id, title, chat_history, last_message, saved_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&history.id)
        .bind(&history.user_id)
        .bind(&history.character_id)
        .bind(&history.title)
        .bind(&history.chat_history)
        .bind(&history.last_message)
        .bind(history.saved_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn get_history(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<ConversationHistoryRecord>, sqlx::Error> {
        // Scoped by owner so a miss and a foreign history are
        // indistinguishable to the caller.
        sqlx::query_as::<_, ConversationHistoryRecord>(
            "SELECT * FROM conversation_histories WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await
    }

    async fn list_histories(
        &self,
        user_id: &str,
        character_id: &str,
    ) -> Result<Vec<ConversationHistoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, ConversationHistoryRecord>(
            r#"
            SELECT * FROM conversation_histories
            WHERE user_id = ? AND character_id = ?
            ORDER BY saved_at DESC
            "#,
        )
        .bind(user_id)
        .bind(character_id)
        .fetch_all(self.pool())
        .await
    }

    async fn rename_history(&self, id: &str, title: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE conversation_histories SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn delete_history(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM conversation_histories WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
