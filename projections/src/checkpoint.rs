//! Per-projection checkpoint (§4.8): `{ name, last_processed_position,
//! updated, total }`, persisted to `checkpoint.json` and reloaded on daemon
//! restart so polling resumes rather than replaying the whole log.

use crate::atomic::write_json;
use crate::error::ProjectionError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A projection's persisted progress marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The projection's name, carried for diagnostics when checkpoints are
    /// inspected outside the process that wrote them.
    pub name: String,
    /// The highest event position folded into this projection so far. `0`
    /// means nothing has been processed yet.
    pub last_processed_position: u64,
    /// When this checkpoint was last saved.
    pub updated: DateTime<Utc>,
    /// Total number of events folded into this projection over its lifetime.
    pub total: u64,
}

impl Checkpoint {
    /// A fresh checkpoint at the beginning of the log, stamped `at`.
    #[must_use]
    pub fn beginning(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            last_processed_position: 0,
            updated: at,
            total: 0,
        }
    }

    /// Load `path`'s checkpoint, or a beginning-of-log checkpoint for `name`
    /// stamped `now` if no checkpoint file exists yet.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on read or parse
    /// failure.
    pub async fn load(
        path: &Path,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, ProjectionError> {
        Ok(crate::atomic::read_json(path)
            .await?
            .unwrap_or_else(|| Self::beginning(name, now)))
    }

    /// Persist this checkpoint to `path` via temp-file-rename.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::Io`] / [`ProjectionError::Json`] on write failure.
    pub async fn save(&self, path: &Path) -> Result<(), ProjectionError> {
        write_json(path, self).await
    }

    /// Advance this checkpoint past `position`, stamped `at`, incrementing
    /// `total` by the number of events folded since the last advance.
    pub fn advance(&mut self, position: u64, events_folded: u64, at: DateTime<Utc>) {
        self.last_processed_position = position;
        self.total += events_folded;
        self.updated = at;
    }

    /// Reset to the beginning of the log, stamped `at` (used by rebuild).
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.last_processed_position = 0;
        self.total = 0;
        self.updated = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_returns_beginning_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        let checkpoint = Checkpoint::load(&dir.path().join("checkpoint.json"), "p", now)
            .await
            .unwrap();
        assert_eq!(checkpoint.last_processed_position, 0);
        assert_eq!(checkpoint.name, "p");
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut checkpoint = Checkpoint::beginning("p", Utc::now());
        checkpoint.advance(5, 5, Utc::now());
        checkpoint.save(&path).await.unwrap();

        let reloaded = Checkpoint::load(&path, "p", Utc::now()).await.unwrap();
        assert_eq!(reloaded.last_processed_position, 5);
        assert_eq!(reloaded.total, 5);
    }

    #[test]
    fn reset_clears_progress() {
        let mut checkpoint = Checkpoint::beginning("p", Utc::now());
        checkpoint.advance(5, 5, Utc::now());
        checkpoint.reset(Utc::now());
        assert_eq!(checkpoint.last_processed_position, 0);
        assert_eq!(checkpoint.total, 0);
    }
}
