//! Errors raised by the projection store, checkpoint, and daemon.

use thiserror::Error;

/// Errors surfaced by `dcb-projections`.
#[derive(Error, Debug)]
pub enum ProjectionError {
    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A state, metadata, or checkpoint file could not be parsed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// No state is recorded for the requested key.
    #[error("no state for key '{0}'")]
    KeyNotFound(String),

    /// The underlying event store failed.
    #[error("event store error: {0}")]
    Store(#[from] dcb_core::store::EventStoreError),

    /// Daemon or rebuild configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProjectionError>;
