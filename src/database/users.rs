//! User and bearer-token lookups
//!
//! Account lifecycle lives in the accounts service. The conversation
//! engine only resolves bearer tokens to user identities, plus enough
//! write access to seed fixtures.

use chrono::Utc;

use super::models::UserRecord;
use super::Database;

/// Extension trait for user and auth-token database operations
pub trait UserOps {
    fn create_user(&self, user: &UserRecord) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_user(&self, id: &str) -> impl std::future::Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;

    /// Register a bearer token for a user (issued externally).
    fn insert_auth_token(&self, token: &str, user_id: &str) -> impl std::future::Future<Output = Result<(), sqlx::Error>> + Send;

    /// Resolve a bearer token to its user, if the token is known.
    fn user_for_token(&self, token: &str) -> impl std::future::Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
}

impl UserOps for Database {
    async fn create_user(&self, user: &UserRecord) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(user.created_at)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await
    }

    async fn insert_auth_token(&self, token: &str, user_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO auth_tokens (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(Utc::now())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT u.* FROM users u
            JOIN auth_tokens t ON t.user_id = u.id
            WHERE t.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
    }
}
