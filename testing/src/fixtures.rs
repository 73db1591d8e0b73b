//! A disposable, file-backed event store for tests.

use dcb_core::store::EventStoreError;
use dcb_store::config::reset_registered_store_name;
use dcb_store::{FileEventStore, StoreConfig};
use tempfile::TempDir;

/// A [`FileEventStore`] rooted in a freshly created `TempDir`, dropped (and
/// its directory removed) at the end of the test that owns it.
///
/// Every call resets the process-wide registered store name before opening,
/// so many `TestStore`s may coexist within one test binary despite the
/// single-store-name-per-process rule a real embedding application is held
/// to (see `dcb_store::config::StoreConfig::validate`).
pub struct TestStore {
    dir: TempDir,
    store: FileEventStore,
}

impl TestStore {
    /// Open a store under a fresh temp directory with default configuration
    /// (`flush_events_immediately: true`, `write_protect_event_files: true`),
    /// named `"fixture"`.
    ///
    /// # Panics
    ///
    /// If the temp directory cannot be created or the store fails to open —
    /// both indicate a broken test environment, not a condition a test
    /// should recover from.
    #[allow(clippy::expect_used)]
    pub async fn open() -> Self {
        Self::with_config_override(|config| config).await
    }

    /// Open a store with `override_fn` applied to the default
    /// [`StoreConfig`] before it is validated, e.g. to disable
    /// `flush_events_immediately` for a throughput-sensitive test.
    ///
    /// # Panics
    ///
    /// Same conditions as [`TestStore::open`].
    #[allow(clippy::expect_used)]
    pub async fn with_config_override(override_fn: impl FnOnce(StoreConfig) -> StoreConfig) -> Self {
        let dir = TempDir::new().expect("failed to create temp directory for test store");
        reset_registered_store_name();
        let config = override_fn(StoreConfig {
            root_path: dir.path().to_path_buf(),
            store_name: "fixture".to_string(),
            ..StoreConfig::default()
        });
        let store = FileEventStore::open(config)
            .await
            .expect("failed to open fixture store");
        Self { dir, store }
    }

    /// The underlying store, ready to append to and read from.
    #[must_use]
    pub fn store(&self) -> &FileEventStore {
        &self.store
    }

    /// The temp directory this fixture's store is rooted in.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Reopen a fresh [`FileEventStore`] handle against the same on-disk
    /// directory, exercising the recovery path a restarted process takes.
    ///
    /// # Panics
    ///
    /// If the store fails to reopen.
    #[allow(clippy::expect_used)]
    pub async fn reopen(&self) -> FileEventStore {
        reset_registered_store_name();
        let config = StoreConfig {
            root_path: self.dir.path().to_path_buf(),
            store_name: "fixture".to_string(),
            ..StoreConfig::default()
        };
        FileEventStore::open(config)
            .await
            .expect("failed to reopen fixture store")
    }
}

/// True iff `error` is the one retryable condition `ExecuteDecision` acts
/// on; a small predicate shared by tests that assert on retry behavior
/// without importing `dcb_runtime` directly.
#[must_use]
pub fn is_append_condition_failed(error: &EventStoreError) -> bool {
    matches!(error, EventStoreError::AppendConditionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcb_core::event::NewEvent;
    use dcb_core::query::Query;
    use dcb_core::store::{EventStore, ReadOptions};
    use serde_json::json;

    #[tokio::test]
    async fn open_then_append_then_read_round_trips() {
        let fixture = TestStore::open().await;
        fixture
            .store()
            .append(vec![NewEvent::new("X.v1", json!({"n": 1}))], None)
            .await
            .unwrap();

        let events = fixture
            .store()
            .read(Query::all(), ReadOptions::ascending(), None)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].position, 1);
    }

    #[tokio::test]
    async fn reopen_preserves_previously_appended_events() {
        let fixture = TestStore::open().await;
        fixture
            .store()
            .append(vec![NewEvent::new("X.v1", json!({}))], None)
            .await
            .unwrap();

        let reopened = fixture.reopen().await;
        let events = reopened
            .read(Query::all(), ReadOptions::ascending(), None)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn many_fixtures_coexist_in_one_test_binary() {
        let first = TestStore::open().await;
        let second = TestStore::open().await;
        assert_ne!(first.path(), second.path());

        first
            .store()
            .append(vec![NewEvent::new("X.v1", json!({}))], None)
            .await
            .unwrap();
        let second_events = second
            .store()
            .read(Query::all(), ReadOptions::ascending(), None)
            .await
            .unwrap();
        assert!(second_events.is_empty());
    }
}
