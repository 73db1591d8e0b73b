//! Error types internal to the file-backed store, convertible into
//! [`dcb_core::store::EventStoreError`] at the trait boundary.

use dcb_core::store::EventStoreError;
use thiserror::Error;

/// Errors raised by the file-backed store's internals.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An event or index file could not be parsed as JSON.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A shared lock could not be acquired within the bounded retry budget.
    #[error("could not acquire lock on {path}: {source}")]
    LockTimeout {
        /// The file that could not be locked.
        path: String,
        /// The underlying I/O error from the final attempt.
        source: std::io::Error,
    },

    /// The append's condition matched a concurrent event.
    #[error("append condition failed")]
    AppendConditionFailed,

    /// `add_tags` targeted a position with no event on record.
    #[error("no event at position {0}")]
    PositionNotFound(u64),

    /// A second, differently-named store was opened in this process.
    #[error("store '{requested}' conflicts with already-registered store '{existing}'")]
    DuplicateStoreName {
        /// The store name already registered in this process.
        existing: String,
        /// The store name this call attempted to register.
        requested: String,
    },

    /// `StoreConfig` failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<StoreError> for EventStoreError {
    fn from(error: StoreError) -> Self {
        let message = error.to_string();
        match error {
            StoreError::AppendConditionFailed => EventStoreError::AppendConditionFailed,
            StoreError::PositionNotFound(position) => EventStoreError::PositionNotFound(position),
            StoreError::Json(err) => EventStoreError::Serialization(err.to_string()),
            StoreError::Io(err) => EventStoreError::Io(err.to_string()),
            StoreError::LockTimeout { .. } => EventStoreError::Io(message),
            StoreError::DuplicateStoreName { .. } | StoreError::Configuration(_) => {
                EventStoreError::Configuration(message)
            }
        }
    }
}
