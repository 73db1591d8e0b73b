//! Shared temp-file-rename read/write helpers, used by the state store, tag
//! index, metadata index, and checkpoint — the same crash-consistency
//! discipline `dcb-store` uses for event files and its own indices.

use crate::error::ProjectionError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse `path` as JSON, or return `None` if it doesn't exist.
///
/// # Errors
///
/// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read or parse
/// failure.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ProjectionError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Serialize `value` and atomically replace `path` via a sibling temp file
/// plus rename.
///
/// # Errors
///
/// [`ProjectionError::Io`] / [`ProjectionError::Json`] on write or rename
/// failure.
pub async fn write_json<T: Serialize + Sync>(
    path: &Path,
    value: &T,
) -> Result<(), ProjectionError> {
    let parent = path.parent().ok_or_else(|| {
        ProjectionError::Configuration(format!("path {} has no parent", path.display()))
    })?;
    tokio::fs::create_dir_all(parent).await?;
    let temp_path = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    tokio::fs::write(&temp_path, serde_json::to_vec(value)?).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Remove `path` if it exists; a no-op otherwise.
///
/// # Errors
///
/// [`ProjectionError::Io`] on removal failure.
pub async fn remove_if_present(path: &Path) -> Result<(), ProjectionError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
