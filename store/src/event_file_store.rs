//! Per-position event files: one JSON file per `SequencedEvent`, written and
//! overwritten through the store's temp-file-rename discipline.

use crate::error::StoreError;
use crate::paths::StoreLayout;
use dcb_core::event::{EventMetadata, SequencedEvent};
use dcb_core::tag::Tag;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize)]
struct EventFileRecord {
    position: u64,
    event_type: String,
    payload: serde_json::Value,
    tags: Vec<Tag>,
    metadata: EventMetadata,
}

impl From<&SequencedEvent> for EventFileRecord {
    fn from(event: &SequencedEvent) -> Self {
        Self {
            position: event.position,
            event_type: event.event_type().to_string(),
            payload: event.payload().clone(),
            tags: event.tags().to_vec(),
            metadata: event.metadata().clone(),
        }
    }
}

impl From<EventFileRecord> for SequencedEvent {
    fn from(record: EventFileRecord) -> Self {
        SequencedEvent::new(
            record.position,
            record.event_type,
            record.payload,
            record.tags,
            record.metadata,
        )
    }
}

/// Reads and writes the one-file-per-event store of committed events.
#[derive(Clone, Debug)]
pub struct EventFileStore {
    layout: StoreLayout,
}

impl EventFileStore {
    /// Bind an event file store to `layout`.
    #[must_use]
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Whether an event file exists at `position`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the filesystem cannot be queried.
    pub async fn exists(&self, position: u64) -> Result<bool, StoreError> {
        Ok(tokio::fs::try_exists(self.layout.event_path(position)).await?)
    }

    /// Read the event at `position`, or `None` if no file exists there.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] / [`StoreError::Json`] on read or parse failure.
    pub async fn read(&self, position: u64) -> Result<Option<SequencedEvent>, StoreError> {
        let path = self.layout.event_path(position);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        let bytes = tokio::fs::read(&path).await?;
        let record: EventFileRecord = serde_json::from_slice(&bytes)?;
        Ok(Some(record.into()))
    }

    /// Write `event` at its own position, creating or overwriting the file.
    ///
    /// Writes go through a sibling temp file followed by a rename so a crash
    /// mid-write never leaves a torn event file. If `write_protect` is set,
    /// the file is marked read-only after the rename; an existing read-only
    /// file at the target path has its read-only bit cleared first so the
    /// rename is never blocked by file permissions (the cross-platform
    /// recovery-overwrite path, §9).
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] on write, permission, or rename failure.
    pub async fn write(
        &self,
        event: &SequencedEvent,
        write_protect: bool,
        flush_immediately: bool,
    ) -> Result<(), StoreError> {
        let path = self.layout.event_path(event.position);
        let parent = path.parent().ok_or_else(|| {
            StoreError::Configuration(format!("event path {} has no parent", path.display()))
        })?;
        tokio::fs::create_dir_all(parent).await?;
        clear_readonly_if_present(&path).await?;

        let record = EventFileRecord::from(event);
        let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        let bytes = serde_json::to_vec(&record)?;
        write_and_optionally_sync(&temp_path, &bytes, flush_immediately).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        if write_protect {
            let mut permissions = tokio::fs::metadata(&path).await?.permissions();
            permissions.set_readonly(true);
            tokio::fs::set_permissions(&path, permissions).await?;
        }
        Ok(())
    }
}

async fn clear_readonly_if_present(path: &Path) -> Result<(), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(());
    }
    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        tokio::fs::set_permissions(path, permissions).await?;
    }
    Ok(())
}

async fn write_and_optionally_sync(
    path: &Path,
    bytes: &[u8],
    flush_immediately: bool,
) -> Result<(), StoreError> {
    use tokio::io::AsyncWriteExt;

    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    if flush_immediately {
        file.sync_all().await?;
    }
    Ok(())
}
