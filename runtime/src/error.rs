//! Errors raised by decision retry orchestration and the projection daemon.

use thiserror::Error;

/// Errors surfaced by `dcb-runtime`.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// `ExecuteDecision` exhausted its retry budget on repeated
    /// `AppendConditionFailed` failures.
    #[error("append condition failed after {attempts} attempt(s)")]
    RetriesExhausted {
        /// Number of attempts made, including the first.
        attempts: usize,
    },

    /// The operation was cancelled before or during a retry.
    #[error("operation cancelled")]
    Cancelled,

    /// The underlying event store returned an error other than
    /// `AppendConditionFailed`; never retried.
    #[error("event store error: {0}")]
    Store(#[from] dcb_core::store::EventStoreError),

    /// A projection operation failed.
    #[error("projection error: {0}")]
    Projection(#[from] dcb_projections::ProjectionError),

    /// Daemon or rebuild configuration failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, RuntimeError>;
