//! Test Fixtures
//!
//! Shared helpers for creating test databases, seeding users,
//! characters, and rooms, and a mock LLM provider.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::core::llm::{
    ChatRequest, ChatResponse, LLMError, LLMProvider, Result as LlmResult,
};
use crate::database::models::{CharacterRecord, RoomRecord, UserRecord};
use crate::database::{CharacterOps, Database, RoomOps, UserOps};

// =============================================================================
// Database Fixtures
// =============================================================================

/// Create a test database in a temporary directory.
/// Returns both the database and the TempDir (which must be kept alive).
pub async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db = Database::new(temp_dir.path())
        .await
        .expect("Failed to create test database");
    (db, temp_dir)
}

/// Seed a user with a registered bearer token. Returns the user record;
/// the token is `tok-{username}`.
pub async fn seed_user(db: &Database, username: &str) -> UserRecord {
    let user = UserRecord::new(username);
    db.create_user(&user).await.expect("Failed to create user");
    db.insert_auth_token(&format!("tok-{username}"), &user.id)
        .await
        .expect("Failed to insert token");
    user
}

/// Seed a minimal character: name and title only.
pub async fn seed_character(db: &Database, owner_id: &str, name: &str) -> CharacterRecord {
    let character = CharacterRecord::new(owner_id, name, format!("The {name}"));
    db.create_character(&character)
        .await
        .expect("Failed to create character");
    character
}

/// Seed a fully populated character: intro fragments, description,
/// character info, example situations, and presentation.
pub async fn seed_full_character(db: &Database, owner_id: &str, name: &str) -> CharacterRecord {
    let mut character = CharacterRecord::new(owner_id, name, format!("The {name}"));
    character.intro = Some(
        r#"[{"id":1,"role":"ai","message":"Hello there."},{"id":2,"role":"ai","message":"Sit down, stay a while."}]"#
            .to_string(),
    );
    character.description = Some("A patient listener with a dry wit.".to_string());
    character.character_info = Some("Lives by the harbor. Collects maps.".to_string());
    character.example_situation = Some(
        r#"[[{"id":1,"role":"user","message":"Rough day."},{"id":2,"role":"ai","message":"Then let's slow it down."}]]"#
            .to_string(),
    );
    character.presentation = Some("Calm, measured, never rushed.".to_string());

    db.create_character(&character)
        .await
        .expect("Failed to create character");
    character
}

/// Seed a room for an existing (user, character) pair.
pub async fn seed_room(db: &Database, user_id: &str, character_id: &str) -> RoomRecord {
    let (room, _created) = db
        .get_or_create_room(user_id, character_id)
        .await
        .expect("Failed to create room");
    room
}

/// One call: user + character + room, ready for conversation tests.
pub async fn seed_conversation(db: &Database, username: &str) -> (UserRecord, CharacterRecord, RoomRecord) {
    let user = seed_user(db, username).await;
    let character = seed_full_character(db, &user.id, "Marin").await;
    let room = seed_room(db, &user.id, &character.id).await;
    (user, character, room)
}

// =============================================================================
// Mock LLM Provider
// =============================================================================

/// A scriptable LLM provider. Responses are consumed from a queue; when
/// the queue is empty a fixed default is returned. Every request is
/// captured for assertion.
pub struct MockProvider {
    queue: Mutex<VecDeque<LlmResult<String>>>,
    default_response: String,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default_response: "A mock reply.".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    /// Queue a successful response for the next call.
    pub fn push_response(&self, content: &str) {
        self.queue
            .lock()
            .unwrap()
            .push_back(Ok(content.to_string()));
    }

    /// Queue a failure for the next call.
    pub fn push_failure(&self) {
        self.queue.lock().unwrap().push_back(Err(LLMError::ApiError {
            status: 503,
            message: "mock outage".to_string(),
        }));
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn chat(&self, request: ChatRequest) -> LlmResult<ChatResponse> {
        self.requests.lock().unwrap().push(request);

        let next = self.queue.lock().unwrap().pop_front();
        let content = match next {
            Some(result) => result?,
            None => self.default_response.clone(),
        };

        Ok(ChatResponse {
            content,
            model: "mock-model".to_string(),
            provider: "mock".to_string(),
            finish_reason: Some("stop".to_string()),
            latency_ms: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::ChatMessage;

    #[tokio::test]
    async fn test_mock_provider_queue_then_default() {
        let provider = MockProvider::new().with_default_response("fallback");
        provider.push_response("first");

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let r1 = provider.chat(request.clone()).await.unwrap();
        let r2 = provider.chat(request).await.unwrap();

        assert_eq!(r1.content, "first");
        assert_eq!(r2.content, "fallback");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockProvider::new();
        provider.push_failure();

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        assert!(provider.chat(request).await.is_err());
    }
}
