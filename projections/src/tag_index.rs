//! The per-projection tag index (§4.7): maps a lowercased `(tag-key,
//! tag-value)` pair to the sorted set of projection keys carrying it.
//!
//! Case handling: tag keys/values are stored exactly as given by
//! `ReadModelProjection::tags`, but index file names and lookups use the
//! lowercased pair, so `Tier=Premium` and `tier=premium` hit the same index
//! file.

use crate::atomic::{read_json, write_json};
use crate::error::ProjectionError;
use crate::paths::ProjectionLayout;
use dcb_core::tag::Tag;
use std::collections::BTreeSet;

/// Reads and maintains one projection's tag indices.
#[derive(Clone, Debug)]
pub struct ProjectionTagIndex {
    layout: ProjectionLayout,
}

impl ProjectionTagIndex {
    /// Bind a tag index to `layout`.
    #[must_use]
    pub fn new(layout: ProjectionLayout) -> Self {
        Self { layout }
    }

    /// The projection keys currently recorded under `tag`.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read or parse
    /// failure.
    pub async fn keys_for_tag(&self, tag: &Tag) -> Result<Vec<String>, ProjectionError> {
        let (key, value) = tag.to_lowercase_pair();
        let path = self.layout.tag_index_path(&key, &value);
        Ok(read_json(&path).await?.unwrap_or_default())
    }

    /// Projection keys carrying every tag in `tags` (AND semantics, §4.7).
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read or parse
    /// failure.
    pub async fn keys_for_all_tags(&self, tags: &[Tag]) -> Result<Vec<String>, ProjectionError> {
        let Some((first, rest)) = tags.split_first() else {
            return Ok(Vec::new());
        };
        let mut intersection: BTreeSet<String> =
            self.keys_for_tag(first).await?.into_iter().collect();
        for tag in rest {
            if intersection.is_empty() {
                break;
            }
            let next: BTreeSet<String> = self.keys_for_tag(tag).await?.into_iter().collect();
            intersection = intersection.intersection(&next).cloned().collect();
        }
        Ok(intersection.into_iter().collect())
    }

    /// Replace `key`'s membership in the tag index: remove it from every
    /// index file in `old_tags` not present in `new_tags`, then add it to
    /// every file in `new_tags` (§4.7: "diffs old vs. new tags ... remove
    /// then add").
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read, parse, or
    /// write failure.
    pub async fn update(
        &self,
        key: &str,
        old_tags: &[Tag],
        new_tags: &[Tag],
    ) -> Result<(), ProjectionError> {
        let new_pairs: BTreeSet<(String, String)> =
            new_tags.iter().map(Tag::to_lowercase_pair).collect();

        for tag in old_tags {
            let pair = tag.to_lowercase_pair();
            if !new_pairs.contains(&pair) {
                self.remove_key_from_pair(key, &pair.0, &pair.1).await?;
            }
        }
        for tag in new_tags {
            self.add_key_to_tag(key, tag).await?;
        }
        Ok(())
    }

    /// Remove `key` from every tag file in `tags` (used by delete).
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read, parse, or
    /// write failure.
    pub async fn remove_key(&self, key: &str, tags: &[Tag]) -> Result<(), ProjectionError> {
        for tag in tags {
            let (lowercase_key, lowercase_value) = tag.to_lowercase_pair();
            self.remove_key_from_pair(key, &lowercase_key, &lowercase_value)
                .await?;
        }
        Ok(())
    }

    async fn add_key_to_tag(&self, key: &str, tag: &Tag) -> Result<(), ProjectionError> {
        let (lowercase_key, lowercase_value) = tag.to_lowercase_pair();
        let path = self.layout.tag_index_path(&lowercase_key, &lowercase_value);
        let mut keys: Vec<String> = read_json(&path).await?.unwrap_or_default();
        if !keys.iter().any(|existing| existing == key) {
            keys.push(key.to_string());
            keys.sort_unstable();
            write_json(&path, &keys).await?;
        }
        Ok(())
    }

    async fn remove_key_from_pair(
        &self,
        key: &str,
        lowercase_key: &str,
        lowercase_value: &str,
    ) -> Result<(), ProjectionError> {
        let path = self.layout.tag_index_path(lowercase_key, lowercase_value);
        let mut keys: Vec<String> = read_json(&path).await?.unwrap_or_default();
        let before = keys.len();
        keys.retain(|existing| existing != key);
        if keys.len() != before {
            write_json(&path, &keys).await?;
        }
        Ok(())
    }
}
