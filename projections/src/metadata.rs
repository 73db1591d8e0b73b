//! Per-key diagnostics metadata (§4.7), kept in a single
//! `metadata/index.json` map so the daemon can report staleness without
//! deserializing every state payload.

use crate::atomic::{read_json, write_json};
use crate::error::ProjectionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Diagnostics recorded alongside a projection key's state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// When this key's state was first saved.
    pub created: DateTime<Utc>,
    /// When this key's state was last saved.
    pub updated: DateTime<Utc>,
    /// Incremented on every save; starts at 1.
    pub version: u64,
    /// Size in bytes of the serialized state, for diagnostics.
    pub size: usize,
}

/// The `metadata/index.json` map: key → [`KeyMetadata`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetadataIndex {
    entries: BTreeMap<String, KeyMetadata>,
}

impl MetadataIndex {
    /// Load the metadata index, or an empty one if no file exists yet.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read or parse
    /// failure.
    pub async fn load(path: &Path) -> Result<Self, ProjectionError> {
        Ok(read_json(path).await?.unwrap_or_default())
    }

    /// Persist this index to `path` via temp-file-rename.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on write failure.
    pub async fn save(&self, path: &Path) -> Result<(), ProjectionError> {
        write_json(path, self).await
    }

    /// The metadata recorded for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyMetadata> {
        self.entries.get(key)
    }

    /// Record a save of `key` with a serialized size of `size` bytes at
    /// `now`, bumping `version` and preserving `created` if already present.
    pub fn record_save(&mut self, key: &str, size: usize, now: DateTime<Utc>) {
        self.entries
            .entry(key.to_string())
            .and_modify(|entry| {
                entry.updated = now;
                entry.version += 1;
                entry.size = size;
            })
            .or_insert(KeyMetadata {
                created: now,
                updated: now,
                version: 1,
                size,
            });
    }

    /// Remove `key`'s metadata, if present.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Every key currently tracked.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Discard all recorded metadata (used by rebuild).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
