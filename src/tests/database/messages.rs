//! Transcript Store Tests
//!
//! Ordering, the recent-window query, edit rules, regeneration-group
//! maintenance, and range deletes.

use chrono::Utc;

use crate::database::models::SavedChat;
use crate::database::{ChatRole, MessageOps, RoomOps, TranscriptError};
use crate::tests::common::{create_test_db, seed_character, seed_room, seed_user};

async fn seeded_room(db: &crate::database::Database) -> String {
    let user = seed_user(db, "alice").await;
    let character = seed_character(db, &user.id, "Marin").await;
    seed_room(db, &user.id, &character.id).await.id
}

#[tokio::test]
async fn test_append_assigns_increasing_ids() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    let first = db.append_message(&room_id, "one", ChatRole::User).await.unwrap();
    let second = db.append_message(&room_id, "two", ChatRole::Ai).await.unwrap();

    assert!(second.id > first.id);
    assert!(first.is_main);
    assert!(first.regeneration_group.is_none());
}

#[tokio::test]
async fn test_list_messages_in_creation_order() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    for i in 0..5 {
        let role = if i % 2 == 0 { ChatRole::User } else { ChatRole::Ai };
        db.append_message(&room_id, &format!("msg {i}"), role).await.unwrap();
    }

    let messages = db.list_messages(&room_id).await.unwrap();
    assert_eq!(messages.len(), 5);
    for pair in messages.windows(2) {
        assert!(pair[0].id < pair[1].id);
    }
    assert_eq!(messages[0].content, "msg 0");
    assert_eq!(messages[4].content, "msg 4");
}

#[tokio::test]
async fn test_recent_messages_limit_and_cutoff() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    for i in 0..6 {
        db.append_message(&room_id, &format!("msg {i}"), ChatRole::User)
            .await
            .unwrap();
    }

    let recent = db.recent_messages(&room_id, 3, None).await.unwrap();
    assert_eq!(recent.len(), 3);
    // Newest first.
    assert_eq!(recent[0].content, "msg 5");
    assert_eq!(recent[2].content, "msg 3");

    // Strictly-before cutoff excludes everything at or after it.
    let cutoff = recent[0].created_at;
    let before = db.recent_messages(&room_id, 10, Some(cutoff)).await.unwrap();
    assert!(before.iter().all(|m| m.created_at < cutoff));
}

#[tokio::test]
async fn test_append_bumps_room_updated_at() {
    let (db, _temp) = create_test_db().await;
    let user = seed_user(&db, "alice").await;
    let character = seed_character(&db, &user.id, "Marin").await;
    let room = seed_room(&db, &user.id, &character.id).await;

    db.append_message(&room.id, "hello", ChatRole::User).await.unwrap();

    let after = db.get_room(&room.id).await.unwrap().unwrap();
    assert!(after.updated_at >= room.updated_at);
}

#[tokio::test]
async fn test_update_content_rejects_user_messages() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    let message = db.append_message(&room_id, "original", ChatRole::User).await.unwrap();

    let result = db.update_message_content(&message, "rewritten").await;
    assert!(matches!(result, Err(TranscriptError::NotEditable)));

    // Transcript unchanged.
    let unchanged = db.get_message(&room_id, message.id).await.unwrap().unwrap();
    assert_eq!(unchanged.content, "original");
}

#[tokio::test]
async fn test_update_content_edits_ai_messages() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    let message = db.append_message(&room_id, "draft", ChatRole::Ai).await.unwrap();

    let edited = db.update_message_content(&message, "final").await.unwrap();
    assert_eq!(edited.content, "final");
    assert_eq!(edited.id, message.id);

    // Idempotent beyond updated_at.
    let again = db.update_message_content(&edited, "final").await.unwrap();
    assert_eq!(again.content, "final");
}

#[tokio::test]
async fn test_set_main_keeps_one_canonical_per_group() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    db.append_message(&room_id, "prompt", ChatRole::User).await.unwrap();
    let alt_a = db.append_message(&room_id, "take one", ChatRole::Ai).await.unwrap();
    let alt_b = db.append_message(&room_id, "take two", ChatRole::Ai).await.unwrap();

    let group = "grp-1";
    db.set_regeneration_group(alt_a.id, group).await.unwrap();
    db.set_regeneration_group(alt_b.id, group).await.unwrap();
    db.set_main_message(&room_id, alt_b.id, group).await.unwrap();

    let messages = db.list_messages(&room_id).await.unwrap();
    let mains: Vec<_> = messages
        .iter()
        .filter(|m| m.regeneration_group.as_deref() == Some(group) && m.is_main)
        .collect();
    assert_eq!(mains.len(), 1);
    assert_eq!(mains[0].id, alt_b.id);

    // Flip back.
    db.set_main_message(&room_id, alt_a.id, group).await.unwrap();
    let flipped = db.get_message(&room_id, alt_a.id).await.unwrap().unwrap();
    assert!(flipped.is_main);
    let other = db.get_message(&room_id, alt_b.id).await.unwrap().unwrap();
    assert!(!other.is_main);
}

#[tokio::test]
async fn test_delete_from_removes_tail_and_group() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    let m1 = db.append_message(&room_id, "keep", ChatRole::User).await.unwrap();
    let m2 = db.append_message(&room_id, "alternate", ChatRole::Ai).await.unwrap();
    let m3 = db.append_message(&room_id, "target", ChatRole::User).await.unwrap();
    let m4 = db.append_message(&room_id, "tail", ChatRole::Ai).await.unwrap();

    // m2 shares a group with the target; it sits before the target but
    // must still be removed.
    let group = "grp-2";
    db.set_regeneration_group(m2.id, group).await.unwrap();
    db.set_regeneration_group(m3.id, group).await.unwrap();

    let target = db.get_message(&room_id, m3.id).await.unwrap().unwrap();
    let deleted = db.delete_from_message(&room_id, &target).await.unwrap();
    assert_eq!(deleted, 3);

    let remaining = db.list_messages(&room_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, m1.id);
    assert!(db.get_message(&room_id, m2.id).await.unwrap().is_none());
    assert!(db.get_message(&room_id, m4.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_from_without_group_removes_only_tail() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    let m1 = db.append_message(&room_id, "keep", ChatRole::User).await.unwrap();
    let m2 = db.append_message(&room_id, "target", ChatRole::Ai).await.unwrap();
    db.append_message(&room_id, "tail", ChatRole::User).await.unwrap();

    let target = db.get_message(&room_id, m2.id).await.unwrap().unwrap();
    let deleted = db.delete_from_message(&room_id, &target).await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = db.list_messages(&room_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, m1.id);
}

#[tokio::test]
async fn test_last_message_and_last_user_message() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    assert!(db.last_message(&room_id).await.unwrap().is_none());

    db.append_message(&room_id, "question", ChatRole::User).await.unwrap();
    db.append_message(&room_id, "answer", ChatRole::Ai).await.unwrap();

    let last = db.last_message(&room_id).await.unwrap().unwrap();
    assert_eq!(last.content, "answer");

    let last_user = db.last_user_message(&room_id).await.unwrap().unwrap();
    assert_eq!(last_user.content, "question");
}

#[tokio::test]
async fn test_append_saved_message_preserves_metadata() {
    let (db, _temp) = create_test_db().await;
    let room_id = seeded_room(&db).await;

    let saved = SavedChat {
        content: "restored turn".to_string(),
        role: "ai".to_string(),
        is_main: false,
        regeneration_group: Some("grp-9".to_string()),
        timestamp: Utc::now() - chrono::Duration::days(3),
    };

    let message = db.append_saved_message(&room_id, &saved).await.unwrap();

    assert_eq!(message.content, "restored turn");
    assert_eq!(message.role, "ai");
    assert!(!message.is_main);
    assert_eq!(message.regeneration_group.as_deref(), Some("grp-9"));
    assert_eq!(message.created_at, saved.timestamp);
}
