//! Database Layer
//!
//! SQLite-backed persistence for the conversation engine. Operations are
//! grouped into extension traits on [`Database`], one per resource.

pub mod characters;
pub mod histories;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod rooms;
pub mod users;

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

pub use characters::CharacterOps;
pub use histories::HistoryOps;
pub use messages::{MessageOps, TranscriptError};
pub use models::{
    AuthTokenRecord, CharacterRecord, ChatRole, ConversationHistoryRecord, MessageRecord,
    RoomRecord, SavedChat, UserRecord,
};
pub use rooms::RoomOps;
pub use users::UserOps;

/// Handle to the application database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database under `data_dir` and run migrations.
    pub async fn new(data_dir: &Path) -> Result<Self, sqlx::Error> {
        std::fs::create_dir_all(data_dir).map_err(|e| sqlx::Error::Io(e))?;

        let db_path = data_dir.join("confidant.db");
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
            .map_err(|e| sqlx::Error::Configuration(Box::new(e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        migrations::run_migrations(&pool).await?;

        info!("Database opened at {}", db_path.display());

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
