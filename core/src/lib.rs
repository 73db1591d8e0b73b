//! # DCB Core
//!
//! Core data model and traits for the Dynamic Consistency Boundary (DCB)
//! event store: an append-only log of immutable events with tag/type
//! secondary indices, optimistic concurrency scoped to arbitrary query
//! predicates, and the decision-model layer that composes independent
//! projections into a single read-decide-append cycle.
//!
//! ## Crate Layout
//!
//! - [`tag`]: the `(key, value)` pairs events and projection states carry.
//! - [`event`]: `NewEvent` (input) and `SequencedEvent` (output).
//! - [`query`]: `QueryItem`/`Query`, the OR-of-ANDs boolean algebra over
//!   event types and tags, with both index-resolvable and in-memory forms.
//! - [`condition`]: `AppendCondition`, the optimistic-concurrency predicate.
//! - [`store`]: the `EventStore` trait, implemented by `dcb-store`.
//! - [`decision`]: the Decision Model layer — composing projections into one
//!   read, folding matching events, and deriving the resulting
//!   `AppendCondition`.
//!
//! This crate has no I/O of its own; it is pure data model plus the
//! `EventStore` trait boundary. Concrete storage lives in `dcb-store`,
//! checkpointed read models in `dcb-projections`, and the retry/daemon
//! orchestration in `dcb-runtime`.

pub mod condition;
pub mod decision;
pub mod event;
pub mod query;
pub mod store;
pub mod tag;

pub use condition::AppendCondition;
pub use event::{EventMetadata, NewEvent, SequencedEvent};
pub use query::{Query, QueryItem};
pub use store::{EventStore, EventStoreError, ReadDirection, ReadOptions};
pub use tag::Tag;
