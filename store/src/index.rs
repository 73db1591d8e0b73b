//! Event-type and tag secondary indices: one file per key, holding a sorted,
//! deduplicated list of positions. Only ever appended to — the event-level
//! indices never remove a position (unlike the projection-keyed indices in
//! `dcb-projections`, which do).

use crate::error::StoreError;
use crate::paths::StoreLayout;
use dcb_core::tag::Tag;
use std::path::{Path, PathBuf};

/// Reads and maintains the on-disk event-type and tag indices for one store.
#[derive(Clone, Debug)]
pub struct IndexStore {
    layout: StoreLayout,
}

impl IndexStore {
    /// Bind an index store to `layout`.
    #[must_use]
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// The sorted positions recorded against `event_type`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Json`] on read or parse failure.
    pub async fn type_positions(&self, event_type: &str) -> Result<Vec<u64>, StoreError> {
        read_position_list(&self.layout.event_type_index_path(event_type)).await
    }

    /// The sorted positions recorded against `tag`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Json`] on read or parse failure.
    pub async fn tag_positions(&self, tag: &Tag) -> Result<Vec<u64>, StoreError> {
        read_position_list(&self.layout.tag_index_path(tag)).await
    }

    /// Append `position` to `event_type`'s index, deduplicated and sorted.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Json`] on read, parse, or write
    /// failure.
    pub async fn add_to_type_index(
        &self,
        event_type: &str,
        position: u64,
    ) -> Result<(), StoreError> {
        append_position(&self.layout.event_type_index_path(event_type), position).await
    }

    /// Append `position` to `tag`'s index, deduplicated and sorted.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Json`] on read, parse, or write
    /// failure.
    pub async fn add_to_tag_index(&self, tag: &Tag, position: u64) -> Result<(), StoreError> {
        append_position(&self.layout.tag_index_path(tag), position).await
    }
}

async fn read_position_list(path: &Path) -> Result<Vec<u64>, StoreError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(Vec::new());
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn append_position(path: &Path, position: u64) -> Result<(), StoreError> {
    let mut positions = read_position_list(path).await?;
    if positions.binary_search(&position).is_ok() {
        return Ok(());
    }
    let insert_at = positions.partition_point(|existing| *existing < position);
    positions.insert(insert_at, position);
    write_position_list(path, &positions).await
}

async fn write_position_list(path: &Path, positions: &[u64]) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| {
        StoreError::Configuration(format!("index path {} has no parent", path.display()))
    })?;
    tokio::fs::create_dir_all(parent).await?;
    let temp_path: PathBuf = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    tokio::fs::write(&temp_path, serde_json::to_vec(positions)?).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path as StdPath;

    fn layout(dir: &StdPath) -> StoreLayout {
        StoreLayout::new(dir, "s")
    }

    #[tokio::test]
    async fn missing_index_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = IndexStore::new(layout(dir.path()));
        assert_eq!(index.type_positions("X").await.unwrap(), Vec::<u64>::new());
    }

    #[tokio::test]
    async fn add_to_type_index_is_sorted_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let index = IndexStore::new(layout(dir.path()));
        index.add_to_type_index("X", 5).await.unwrap();
        index.add_to_type_index("X", 1).await.unwrap();
        index.add_to_type_index("X", 5).await.unwrap();
        index.add_to_type_index("X", 3).await.unwrap();

        assert_eq!(index.type_positions("X").await.unwrap(), vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn tag_index_is_independent_per_tag() {
        let dir = tempfile::tempdir().unwrap();
        let index = IndexStore::new(layout(dir.path()));
        let a = Tag::new("k", "a").unwrap();
        let b = Tag::new("k", "b").unwrap();
        index.add_to_tag_index(&a, 1).await.unwrap();
        index.add_to_tag_index(&b, 2).await.unwrap();

        assert_eq!(index.tag_positions(&a).await.unwrap(), vec![1]);
        assert_eq!(index.tag_positions(&b).await.unwrap(), vec![2]);
    }
}
