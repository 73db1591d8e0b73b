//! The ledger: a single small JSON file recording the last committed
//! sequence position. Reads take a shared lock with bounded retry; writes go
//! through the store's temp-file-rename discipline so a crash mid-write
//! never leaves a torn ledger.

use crate::error::StoreError;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const LOCK_RETRY_ATTEMPTS: u32 = 5;
const LOCK_RETRY_BASE_DELAY: Duration = Duration::from_millis(10);

/// The ledger's on-disk record.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LedgerRecord {
    /// The highest committed sequence position, or 0 if the log is empty.
    pub last_sequence_position: u64,
    /// The number of events committed so far. Maintained alongside
    /// `last_sequence_position` for diagnostics; not load-bearing for any
    /// invariant.
    pub event_count: u64,
}

/// Owns the ledger file path and provides load/commit operations.
#[derive(Clone, Debug)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Point a ledger at `path`. Does not touch the filesystem.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the current ledger record, or the zero record if the ledger
    /// file does not exist yet (a brand-new store).
    ///
    /// A corrupt (unparseable) ledger file is treated as the zero record
    /// rather than an error — the store continues in a degraded state
    /// rather than refusing to open (§7: "Ledger parse error ... store
    /// continues (degraded)").
    ///
    /// # Errors
    ///
    /// [`StoreError::LockTimeout`] if a shared lock cannot be acquired within
    /// the bounded retry budget; [`StoreError::Io`] on read failure.
    pub async fn load(&self) -> Result<LedgerRecord, StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&path))
            .await
            .expect("ledger load task panicked")
    }

    fn load_blocking(path: &Path) -> Result<LedgerRecord, StoreError> {
        if !path.exists() {
            return Ok(LedgerRecord::default());
        }
        let file = File::open(path)?;
        let mut delay = LOCK_RETRY_BASE_DELAY;
        let mut last_err = None;
        for attempt in 0..LOCK_RETRY_ATTEMPTS {
            match file.try_lock_shared() {
                Ok(()) => {
                    let mut contents = String::new();
                    let mut locked = &file;
                    let read_result = locked.read_to_string(&mut contents);
                    let _ = FileExt::unlock(&file);
                    read_result?;
                    return Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
                        warn!(
                            path = %path.display(),
                            error = %err,
                            "ledger file corrupt, degrading to last_position=0"
                        );
                        LedgerRecord::default()
                    }));
                }
                Err(err) if attempt + 1 < LOCK_RETRY_ATTEMPTS => {
                    warn!(attempt, path = %path.display(), "ledger locked, retrying");
                    std::thread::sleep(delay);
                    delay *= 2;
                    last_err = Some(err);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(StoreError::LockTimeout {
            path: path.display().to_string(),
            source: last_err.expect("retry loop always records an error before exiting"),
        })
    }

    /// Atomically replace the ledger with `record`: write to a sibling temp
    /// file, then rename over the ledger path.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] on write or rename failure.
    pub async fn commit(&self, record: LedgerRecord) -> Result<(), StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::commit_blocking(&path, record))
            .await
            .expect("ledger commit task panicked")
    }

    fn commit_blocking(path: &Path, record: LedgerRecord) -> Result<(), StoreError> {
        let parent = path.parent().ok_or_else(|| {
            StoreError::Configuration(format!("ledger path {} has no parent", path.display()))
        })?;
        std::fs::create_dir_all(parent)?;
        let temp_path = parent.join(format!(".ledger.{}.tmp", uuid::Uuid::new_v4()));
        std::fs::write(&temp_path, serde_json::to_vec(&record)?)?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_ledger_returns_zero_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join(".ledger"));
        let record = ledger.load().await.unwrap();
        assert_eq!(record.last_sequence_position, 0);
        assert_eq!(record.event_count, 0);
    }

    #[tokio::test]
    async fn commit_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join(".ledger"));
        ledger
            .commit(LedgerRecord {
                last_sequence_position: 7,
                event_count: 7,
            })
            .await
            .unwrap();

        let record = ledger.load().await.unwrap();
        assert_eq!(record.last_sequence_position, 7);
        assert_eq!(record.event_count, 7);
    }

    #[tokio::test]
    async fn corrupt_ledger_degrades_to_zero_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ledger");
        std::fs::write(&path, b"not json").unwrap();
        let ledger = Ledger::new(path);

        let record = ledger.load().await.unwrap();
        assert_eq!(record.last_sequence_position, 0);
        assert_eq!(record.event_count, 0);
    }

    #[tokio::test]
    async fn commit_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(dir.path().join(".ledger"));
        ledger
            .commit(LedgerRecord {
                last_sequence_position: 1,
                event_count: 1,
            })
            .await
            .unwrap();
        ledger
            .commit(LedgerRecord {
                last_sequence_position: 2,
                event_count: 2,
            })
            .await
            .unwrap();

        let record = ledger.load().await.unwrap();
        assert_eq!(record.last_sequence_position, 2);
    }
}
