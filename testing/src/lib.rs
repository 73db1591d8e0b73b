//! # DCB Testing
//!
//! Test fixtures and property-test strategies shared across this
//! workspace's integration and property tests.
//!
//! This crate provides:
//! - [`fixtures::TestStore`]: a `tempfile`-backed `FileEventStore`, rooted in
//!   a fresh `TempDir` per test and exempted from the single-store-name
//!   registry so many fixtures can coexist in one test binary.
//! - [`strategies`]: `proptest` strategies for the core domain types (tags,
//!   event types, new events), used by property-style invariants such as
//!   strictly increasing positions, `from_position` equivalence, and tag
//!   round-trips.
//!
//! ## Example
//!
//! ```
//! use dcb_testing::fixtures::TestStore;
//! use dcb_core::event::NewEvent;
//! use dcb_core::store::{EventStore, ReadOptions};
//! use dcb_core::query::Query;
//! use serde_json::json;
//!
//! # async fn run() {
//! let fixture = TestStore::open().await;
//! fixture
//!     .store()
//!     .append(vec![NewEvent::new("X.v1", json!({}))], None)
//!     .await
//!     .unwrap();
//!
//! let events = fixture
//!     .store()
//!     .read(Query::all(), ReadOptions::ascending(), None)
//!     .await
//!     .unwrap();
//! assert_eq!(events.len(), 1);
//! # }
//! ```

pub mod fixtures;
pub mod strategies;

pub use fixtures::TestStore;
