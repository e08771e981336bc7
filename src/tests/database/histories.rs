//! Conversation History Store Tests
//!
//! Owner scoping, (user, character) listing, rename, and delete.

use chrono::{Duration, Utc};

use crate::database::models::{ConversationHistoryRecord, SavedChat};
use crate::database::HistoryOps;
use crate::tests::common::{create_test_db, seed_character, seed_user};

fn snapshot_entries(n: usize) -> Vec<SavedChat> {
    (0..n)
        .map(|i| SavedChat {
            content: format!("turn {i}"),
            role: if i % 2 == 0 { "user" } else { "ai" }.to_string(),
            is_main: true,
            regeneration_group: None,
            timestamp: Utc::now(),
        })
        .collect()
}

#[tokio::test]
async fn test_save_and_get_history() {
    let (db, _temp) = create_test_db().await;
    let user = seed_user(&db, "alice").await;
    let character = seed_character(&db, &user.id, "Marin").await;

    let record = ConversationHistoryRecord::new(
        &user.id,
        &character.id,
        "First save",
        &snapshot_entries(4),
    )
    .unwrap();
    db.save_history(&record).await.unwrap();

    let fetched = db.get_history(&record.id, &user.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "First save");
    assert_eq!(fetched.entries().len(), 4);
    assert_eq!(fetched.last_message, "turn 3");
}

#[tokio::test]
async fn test_get_history_is_owner_scoped() {
    let (db, _temp) = create_test_db().await;
    let alice = seed_user(&db, "alice").await;
    let mallory = seed_user(&db, "mallory").await;
    let character = seed_character(&db, &alice.id, "Marin").await;

    let record =
        ConversationHistoryRecord::new(&alice.id, &character.id, "Private", &snapshot_entries(2))
            .unwrap();
    db.save_history(&record).await.unwrap();

    assert!(db.get_history(&record.id, &alice.id).await.unwrap().is_some());
    // A foreign history resolves like a missing one.
    assert!(db.get_history(&record.id, &mallory.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_histories_scoped_and_newest_first() {
    let (db, _temp) = create_test_db().await;
    let user = seed_user(&db, "alice").await;
    let marin = seed_character(&db, &user.id, "Marin").await;
    let sable = seed_character(&db, &user.id, "Sable").await;

    let mut older =
        ConversationHistoryRecord::new(&user.id, &marin.id, "Older", &snapshot_entries(2)).unwrap();
    older.saved_at = Utc::now() - Duration::hours(2);
    db.save_history(&older).await.unwrap();

    let newer =
        ConversationHistoryRecord::new(&user.id, &marin.id, "Newer", &snapshot_entries(2)).unwrap();
    db.save_history(&newer).await.unwrap();

    let other =
        ConversationHistoryRecord::new(&user.id, &sable.id, "Other", &snapshot_entries(2)).unwrap();
    db.save_history(&other).await.unwrap();

    let listed = db.list_histories(&user.id, &marin.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].title, "Newer");
    assert_eq!(listed[1].title, "Older");
}

#[tokio::test]
async fn test_rename_and_delete_history() {
    let (db, _temp) = create_test_db().await;
    let user = seed_user(&db, "alice").await;
    let character = seed_character(&db, &user.id, "Marin").await;

    let record =
        ConversationHistoryRecord::new(&user.id, &character.id, "Draft", &snapshot_entries(2))
            .unwrap();
    db.save_history(&record).await.unwrap();

    db.rename_history(&record.id, "Final").await.unwrap();
    let renamed = db.get_history(&record.id, &user.id).await.unwrap().unwrap();
    assert_eq!(renamed.title, "Final");

    db.delete_history(&record.id).await.unwrap();
    assert!(db.get_history(&record.id, &user.id).await.unwrap().is_none());
}
