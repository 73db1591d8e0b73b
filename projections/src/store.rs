//! `ProjectionStore<P>`: the file-backed keyed read model a daemon writes to
//! and callers read from (§4.7).

use crate::atomic::{read_json, remove_if_present, write_json};
use crate::error::Result;
use crate::metadata::MetadataIndex;
use crate::paths::ProjectionLayout;
use crate::projection::ReadModelProjection;
use crate::tag_index::ProjectionTagIndex;
use chrono::Utc;
use dcb_core::tag::Tag;
use std::marker::PhantomData;
use std::path::Path;

/// Get/List/QueryByTag/QueryByTags/Save/Delete over one projection's keyed
/// state, with its tag index and metadata kept consistent on every write.
pub struct ProjectionStore<P: ReadModelProjection> {
    layout: ProjectionLayout,
    tag_index: ProjectionTagIndex,
    _state: PhantomData<fn() -> P::State>,
}

impl<P: ReadModelProjection> ProjectionStore<P> {
    /// Bind a store to `projection`'s directory under `projections_root`
    /// (typically `dcb_store::StoreLayout::projections_dir()`).
    #[must_use]
    pub fn new(projections_root: &Path, projection: &P) -> Self {
        let layout = ProjectionLayout::new(projections_root, projection.name());
        Self {
            tag_index: ProjectionTagIndex::new(layout.clone()),
            layout,
            _state: PhantomData,
        }
    }

    /// The layout this store operates over (used by the daemon to locate
    /// the checkpoint file).
    #[must_use]
    pub fn layout(&self) -> &ProjectionLayout {
        &self.layout
    }

    /// Fetch the state for `key`, or `None` if it has never been saved (or
    /// was deleted).
    ///
    /// # Errors
    ///
    /// [`crate::error::ProjectionError::Io`] /
    /// [`crate::error::ProjectionError::Json`] on read or parse failure.
    pub async fn get(&self, key: &str) -> Result<Option<P::State>> {
        read_json(&self.layout.state_path(key)).await
    }

    /// All keyed states currently recorded for this projection.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectionStore::get`].
    pub async fn list(&self) -> Result<Vec<(String, P::State)>> {
        let metadata = MetadataIndex::load(&self.layout.metadata_index_path()).await?;
        let mut out = Vec::new();
        for key in metadata.keys() {
            if let Some(state) = self.get(key).await? {
                out.push((key.clone(), state));
            }
        }
        Ok(out)
    }

    /// States whose `tags()` include `tag`.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectionStore::get`].
    pub async fn query_by_tag(&self, tag: &Tag) -> Result<Vec<(String, P::State)>> {
        let keys = self.tag_index.keys_for_tag(tag).await?;
        self.load_many(keys).await
    }

    /// States whose `tags()` include every tag in `tags` (AND, §4.7).
    ///
    /// # Errors
    ///
    /// Same as [`ProjectionStore::get`].
    pub async fn query_by_tags(&self, tags: &[Tag]) -> Result<Vec<(String, P::State)>> {
        let keys = self.tag_index.keys_for_all_tags(tags).await?;
        self.load_many(keys).await
    }

    async fn load_many(&self, keys: Vec<String>) -> Result<Vec<(String, P::State)>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(state) = self.get(&key).await? {
                out.push((key, state));
            }
        }
        Ok(out)
    }

    /// Persist `new_state` under `key`, diffing `projection.tags()` of the
    /// previous state (if any) against the new state's tags and updating the
    /// tag index before the state file itself is replaced.
    ///
    /// # Errors
    ///
    /// [`crate::error::ProjectionError::Io`] /
    /// [`crate::error::ProjectionError::Json`] on read, parse, or write
    /// failure.
    pub async fn save(&self, projection: &P, key: &str, new_state: P::State) -> Result<()> {
        let old_state = self.get(key).await?;
        let old_tags = old_state
            .as_ref()
            .map(|state| projection.tags(state))
            .unwrap_or_default();
        let new_tags = projection.tags(&new_state);
        self.tag_index.update(key, &old_tags, &new_tags).await?;

        let bytes = serde_json::to_vec(&new_state)?;
        write_json(&self.layout.state_path(key), &new_state).await?;

        let metadata_path = self.layout.metadata_index_path();
        let mut metadata = MetadataIndex::load(&metadata_path).await?;
        metadata.record_save(key, bytes.len(), Utc::now());
        metadata.save(&metadata_path).await?;
        Ok(())
    }

    /// Remove `key`'s state, tag-index entries, and metadata entirely.
    ///
    /// # Errors
    ///
    /// Same as [`ProjectionStore::save`].
    pub async fn delete(&self, projection: &P, key: &str) -> Result<()> {
        if let Some(state) = self.get(key).await? {
            let tags = projection.tags(&state);
            self.tag_index.remove_key(key, &tags).await?;
        }
        remove_if_present(&self.layout.state_path(key)).await?;

        let metadata_path = self.layout.metadata_index_path();
        let mut metadata = MetadataIndex::load(&metadata_path).await?;
        metadata.remove(key);
        metadata.save(&metadata_path).await?;
        Ok(())
    }

    /// Destructively clear every state file, tag index, and metadata entry
    /// for this projection (the first step of rebuild, §4.8).
    ///
    /// # Errors
    ///
    /// [`crate::error::ProjectionError::Io`] on removal failure.
    pub async fn clear(&self) -> Result<()> {
        let metadata_path = self.layout.metadata_index_path();
        let metadata = MetadataIndex::load(&metadata_path).await?;
        for key in metadata.keys() {
            remove_if_present(&self.layout.state_path(key)).await?;
        }

        let indices_dir = self.layout.indices_dir();
        if tokio::fs::try_exists(&indices_dir).await? {
            tokio::fs::remove_dir_all(&indices_dir).await?;
        }

        MetadataIndex::default().save(&metadata_path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcb_core::event::{EventMetadata, SequencedEvent};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct CourseSummary {
        capacity: u32,
        tier: String,
    }

    struct CourseProjection {
        event_types: Vec<String>,
    }

    impl CourseProjection {
        fn new() -> Self {
            Self {
                event_types: vec!["CourseCreated.v1".to_string()],
            }
        }
    }

    impl ReadModelProjection for CourseProjection {
        type State = CourseSummary;

        fn name(&self) -> &str {
            "courses"
        }

        fn event_types(&self) -> &[String] {
            &self.event_types
        }

        fn key_selector(&self, event: &SequencedEvent) -> String {
            event.payload()["id"].as_str().unwrap().to_string()
        }

        fn apply(
            &self,
            _current: Option<Self::State>,
            event: &SequencedEvent,
        ) -> Option<Self::State> {
            Some(CourseSummary {
                capacity: event.payload()["capacity"].as_u64().unwrap() as u32,
                tier: event.payload()["tier"].as_str().unwrap().to_string(),
            })
        }

        fn tags(&self, state: &Self::State) -> Vec<Tag> {
            vec![Tag::new("tier", state.tier.clone()).unwrap()]
        }
    }

    fn event(id: &str, capacity: u64, tier: &str) -> SequencedEvent {
        SequencedEvent::new(
            1,
            "CourseCreated.v1",
            json!({"id": id, "capacity": capacity, "tier": tier}),
            vec![],
            EventMetadata::new(),
        )
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let projection = CourseProjection::new();
        let store = ProjectionStore::new(dir.path(), &projection);

        let state = projection
            .apply(None, &event("c-1", 10, "Basic"))
            .unwrap();
        store.save(&projection, "c-1", state.clone()).await.unwrap();

        assert_eq!(store.get("c-1").await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn query_by_tag_reflects_saved_state() {
        let dir = tempfile::tempdir().unwrap();
        let projection = CourseProjection::new();
        let store = ProjectionStore::new(dir.path(), &projection);

        let state = projection
            .apply(None, &event("c-1", 10, "Premium"))
            .unwrap();
        store.save(&projection, "c-1", state).await.unwrap();

        let results = store
            .query_by_tag(&Tag::new("tier", "Premium").unwrap())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "c-1");
    }

    #[tokio::test]
    async fn resaving_with_a_different_tag_moves_the_index_entry() {
        let dir = tempfile::tempdir().unwrap();
        let projection = CourseProjection::new();
        let store = ProjectionStore::new(dir.path(), &projection);

        let basic = projection.apply(None, &event("c-1", 10, "Basic")).unwrap();
        store.save(&projection, "c-1", basic).await.unwrap();

        let premium = projection
            .apply(None, &event("c-1", 10, "Premium"))
            .unwrap();
        store.save(&projection, "c-1", premium).await.unwrap();

        assert!(store
            .query_by_tag(&Tag::new("tier", "Basic").unwrap())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store
                .query_by_tag(&Tag::new("tier", "Premium").unwrap())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn delete_removes_state_and_tag_entries() {
        let dir = tempfile::tempdir().unwrap();
        let projection = CourseProjection::new();
        let store = ProjectionStore::new(dir.path(), &projection);

        let state = projection.apply(None, &event("c-1", 10, "Basic")).unwrap();
        store.save(&projection, "c-1", state).await.unwrap();
        store.delete(&projection, "c-1").await.unwrap();

        assert!(store.get("c-1").await.unwrap().is_none());
        assert!(store
            .query_by_tag(&Tag::new("tier", "Basic").unwrap())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn list_returns_every_saved_key() {
        let dir = tempfile::tempdir().unwrap();
        let projection = CourseProjection::new();
        let store = ProjectionStore::new(dir.path(), &projection);

        for id in ["c-1", "c-2"] {
            let state = projection.apply(None, &event(id, 10, "Basic")).unwrap();
            store.save(&projection, id, state).await.unwrap();
        }

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn clear_removes_all_state_and_indices() {
        let dir = tempfile::tempdir().unwrap();
        let projection = CourseProjection::new();
        let store = ProjectionStore::new(dir.path(), &projection);

        let state = projection.apply(None, &event("c-1", 10, "Basic")).unwrap();
        store.save(&projection, "c-1", state).await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get("c-1").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
        assert!(store
            .query_by_tag(&Tag::new("tier", "Basic").unwrap())
            .await
            .unwrap()
            .is_empty());
    }
}
