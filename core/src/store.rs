//! The `EventStore` trait: the append/read boundary the rest of the system
//! is built on.
//!
//! # Dyn Compatibility
//!
//! This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
//! `async fn` so it stays object-safe (`Arc<dyn EventStore>`). The
//! decision-model and projection
//! daemon layers both hold the store behind a trait object so that
//! `dcb-store`'s concrete file-backed implementation and any future/test
//! implementation are interchangeable without generic plumbing everywhere.

use crate::condition::AppendCondition;
use crate::event::{NewEvent, SequencedEvent};
use crate::query::Query;
use crate::tag::Tag;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors surfaced by an `EventStore` implementation.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// The append's `AppendCondition` matched a concurrent event; the sole
    /// DCB failure mode. Carries no additional state (§6).
    #[error("append condition failed: a concurrent event invalidated this decision")]
    AppendConditionFailed,

    /// `add_tags` was called for a position with no event on record.
    #[error("no event at position {0}")]
    PositionNotFound(u64),

    /// An underlying I/O error (disk full, permission denied, corrupt file).
    /// Not retried by the core; fatal to the in-flight operation.
    #[error("I/O error: {0}")]
    Io(String),

    /// A stored event or index file could not be parsed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store was misconfigured (see `dcb_store::config`).
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Direction in which `Read` returns its matching events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadDirection {
    /// Oldest to newest (the default).
    #[default]
    Ascending,
    /// Newest to oldest.
    Descending,
}

/// Options for `EventStore::read`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOptions {
    /// Sort order of the returned events.
    pub direction: ReadDirection,
}

impl ReadOptions {
    /// Default ascending read.
    #[must_use]
    pub fn ascending() -> Self {
        Self {
            direction: ReadDirection::Ascending,
        }
    }

    /// Descending read (newest first).
    #[must_use]
    pub fn descending() -> Self {
        Self {
            direction: ReadDirection::Descending,
        }
    }
}

/// The append-only, queryable event log.
///
/// An `EventStore` is deliberately narrow: append, read, read-last, and the
/// additive tag-maintenance operation. Everything else — decision models,
/// projections, retries — is built on top of this trait in other crates.
pub trait EventStore: Send + Sync {
    /// Append one or more new events, optionally guarded by an
    /// `AppendCondition`.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::AppendConditionFailed`] if `condition` is set and
    ///   its predicate matches a committed event.
    /// - [`EventStoreError::Io`] / [`EventStoreError::Serialization`] on
    ///   storage failures.
    ///
    /// # Panics
    ///
    /// Implementations must not panic; an empty `events` vec is a no-op that
    /// returns `Ok(())` without allocating a position.
    fn append(
        &self,
        events: Vec<NewEvent>,
        condition: Option<AppendCondition>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>>;

    /// Read events matching `query`, from strictly after `from_position` (or
    /// from the start if `None`), in the order given by `options`.
    ///
    /// # Errors
    ///
    /// [`EventStoreError::Io`] / [`EventStoreError::Serialization`] on
    /// storage failures.
    fn read(
        &self,
        query: Query,
        options: ReadOptions,
        from_position: Option<u64>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SequencedEvent>, EventStoreError>> + Send + '_>>;

    /// Convenience for the single newest event matching `query`.
    ///
    /// Default implementation delegates to [`EventStore::read`] with
    /// `ReadOptions::descending()`, taking the first result.
    ///
    /// # Errors
    ///
    /// Same as [`EventStore::read`].
    fn read_last(
        &self,
        query: Query,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SequencedEvent>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move {
            let mut events = self.read(query, ReadOptions::descending(), None).await?;
            Ok(if events.is_empty() {
                None
            } else {
                Some(events.remove(0))
            })
        })
    }

    /// Additive-only maintenance: append `tags` to the event at `position`,
    /// updating the tag index atomically. Never removes or edits a payload.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::PositionNotFound`] if no event exists at
    ///   `position`.
    /// - [`EventStoreError::Io`] on storage failures.
    fn add_tags(
        &self,
        position: u64,
        tags: Vec<Tag>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_condition_failed_display() {
        let err = EventStoreError::AppendConditionFailed;
        assert!(format!("{err}").contains("concurrent event"));
    }

    #[test]
    fn position_not_found_display() {
        let err = EventStoreError::PositionNotFound(7);
        assert!(format!("{err}").contains('7'));
    }

    #[test]
    fn read_options_defaults_ascending() {
        assert_eq!(ReadOptions::default().direction, ReadDirection::Ascending);
    }
}
