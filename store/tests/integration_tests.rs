//! End-to-end exercises of `FileEventStore` against a real temp-directory
//! filesystem: concurrent appends racing on an `AppendCondition`, and
//! recovery from a reopened store.

use dcb_core::condition::AppendCondition;
use dcb_core::event::NewEvent;
use dcb_core::query::{Query, QueryItem};
use dcb_core::store::{EventStore, EventStoreError, ReadOptions};
use dcb_core::tag::Tag;
use dcb_store::config::reset_registered_store_name;
use dcb_store::{FileEventStore, StoreConfig};
use serde_json::json;
use std::sync::Arc;

async fn open(root: &std::path::Path, name: &str) -> Arc<FileEventStore> {
    reset_registered_store_name();
    Arc::new(
        FileEventStore::open(StoreConfig {
            root_path: root.to_path_buf(),
            store_name: name.to_string(),
            flush_events_immediately: false,
            write_protect_event_files: true,
        })
        .await
        .unwrap(),
    )
}

/// Mirrors the "two students race for the same unique email" scenario: only
/// one of several concurrent appends guarded by the same append condition
/// may succeed.
#[tokio::test]
async fn concurrent_appends_racing_on_a_unique_tag_allow_exactly_one_winner() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path(), "race").await;

    let email = Tag::new("studentEmail", "a@example.com").unwrap();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        let email = email.clone();
        handles.push(tokio::spawn(async move {
            let condition = AppendCondition::new(
                Query::single(QueryItem::any().with_tag(email.clone())),
                None,
            );
            store
                .append(
                    vec![NewEvent::new("StudentRegistered.v1", json!({})).with_tag(email)],
                    Some(condition),
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut failures = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(EventStoreError::AppendConditionFailed) => failures += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(failures, 7);

    let events = store
        .read(
            Query::single(QueryItem::any().with_tag(email)),
            ReadOptions::ascending(),
            None,
        )
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

/// A store reopened against the same directory picks up exactly where the
/// ledger left off; it does not re-deliver or renumber prior events.
#[tokio::test]
async fn reopening_a_store_preserves_positions_and_head() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = open(dir.path(), "reopen").await;
        store
            .append(
                vec![
                    NewEvent::new("X.v1", json!({"n": 1})),
                    NewEvent::new("X.v1", json!({"n": 2})),
                ],
                None,
            )
            .await
            .unwrap();
    }

    let store = open(dir.path(), "reopen").await;
    let events = store
        .read(Query::all(), ReadOptions::ascending(), None)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].position, 1);
    assert_eq!(events[1].position, 2);

    store
        .append(vec![NewEvent::new("X.v1", json!({"n": 3}))], None)
        .await
        .unwrap();
    let events = store
        .read(Query::all(), ReadOptions::ascending(), None)
        .await
        .unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].position, 3);
}

/// From-position reads are equivalent whether the caller supplies the exact
/// position observed in a prior read or zero, modulo the events already seen
/// (covers the "from_position narrows, never widens" property).
#[tokio::test]
async fn read_from_position_is_consistent_with_a_full_read_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path(), "suffix").await;

    for i in 0..5 {
        store
            .append(vec![NewEvent::new("X.v1", json!({"n": i}))], None)
            .await
            .unwrap();
    }

    let full = store
        .read(Query::all(), ReadOptions::ascending(), None)
        .await
        .unwrap();
    let suffix = store
        .read(Query::all(), ReadOptions::ascending(), Some(2))
        .await
        .unwrap();

    assert_eq!(suffix, full[2..]);
}
