//! Character database operations
//!
//! Characters are owned by the character service; the room engine reads
//! them to compose prompts. Creation exists for seeding and tests.

use super::models::CharacterRecord;
use super::Database;

/// Extension trait for character-related database operations
pub trait CharacterOps {
    fn get_character(&self, id: &str) -> impl std::future::Future<Output = Result<Option<CharacterRecord>, sqlx::Error>> + Send;
    fn create_character(&self, character: &CharacterRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
}

impl CharacterOps for Database {
    async fn get_character(&self, id: &str) -> Result<Option<CharacterRecord>, sqlx::Error> {
        sqlx::query_as::<_, CharacterRecord>("SELECT * FROM characters WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn create_character(&self, character: &CharacterRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO characters (id, user_id, name, title, intro, description,
                character_info, example_situation, presentation, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&character.id)
        .bind(&character.user_id)
        .bind(&character.name)
        .bind(&character.title)
        .bind(&character.intro)
        .bind(&character.description)
        .bind(&character.character_info)
        .bind(&character.example_situation)
        .bind(&character.presentation)
        .bind(character.created_at)
        .bind(character.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
