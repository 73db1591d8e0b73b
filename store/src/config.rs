//! `StoreConfig`: a plain struct validated once at construction time, the
//! same shape as this workspace's other config types (e.g.
//! `dcb_runtime::execute_decision::RetryPolicy`) rather than a
//! runtime-checked builder.

use crate::error::StoreError;
use std::path::PathBuf;
use std::sync::Mutex;

/// Configuration for a [`crate::event_store::FileEventStore`].
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory under which the store's named subdirectory is created.
    pub root_path: PathBuf,
    /// The store's name; becomes the subdirectory under `root_path` and the
    /// singleton identity enforced by [`StoreConfig::validate`].
    pub store_name: String,
    /// Whether event file writes are `fsync`'d before the append returns.
    /// `true` favors durability, `false` favors throughput.
    pub flush_events_immediately: bool,
    /// Whether committed event files are marked read-only after writing.
    pub write_protect_event_files: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("./data"),
            store_name: "default".to_string(),
            flush_events_immediately: true,
            write_protect_event_files: true,
        }
    }
}

impl StoreConfig {
    /// Validate this configuration and register its `store_name` as the
    /// sole store identity for this process.
    ///
    /// A process may only ever open stores under one `store_name`; a second,
    /// differently-named `StoreConfig` fails validation rather than silently
    /// operating two logical stores side by side (§6).
    ///
    /// # Errors
    ///
    /// [`StoreError::Configuration`] if `root_path` is not absolute or
    /// `store_name` is empty; [`StoreError::DuplicateStoreName`] if a
    /// different store name was already registered in this process.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.store_name.trim().is_empty() {
            return Err(StoreError::Configuration(
                "store_name must not be empty".to_string(),
            ));
        }
        if !self.root_path.is_absolute() {
            return Err(StoreError::Configuration(format!(
                "root_path must be absolute, got {}",
                self.root_path.display()
            )));
        }
        register_store_name(&self.store_name)
    }
}

static REGISTERED_STORE_NAME: Mutex<Option<String>> = Mutex::new(None);

fn register_store_name(name: &str) -> Result<(), StoreError> {
    let mut guard = REGISTERED_STORE_NAME
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    match guard.as_deref() {
        Some(existing) if existing != name => Err(StoreError::DuplicateStoreName {
            existing: existing.to_string(),
            requested: name.to_string(),
        }),
        _ => {
            *guard = Some(name.to_string());
            Ok(())
        }
    }
}

/// Clears the process-wide registered store name. Only meaningful in test
/// binaries, where many unrelated `FileEventStore`s are opened in one
/// process and must not be mistaken for the same logical store.
#[cfg(any(test, feature = "test-util"))]
pub fn reset_registered_store_name() {
    let mut guard = REGISTERED_STORE_NAME
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    *guard = None;
}
