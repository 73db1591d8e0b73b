//! Event types: the immutable facts appended to and read from the store.
//!
//! # Design
//!
//! The core treats a payload as opaque JSON plus a stable `event_type` string
//! (see §9 of the design notes: "Polymorphism over event payloads"). Only
//! caller-supplied `apply` functions (in the decision-model and projection
//! layers) interpret the payload; the store itself never deserializes it.
//!
//! # Example
//!
//! ```
//! use dcb_core::event::NewEvent;
//! use dcb_core::tag::Tag;
//! use serde_json::json;
//!
//! let event = NewEvent::new("StudentRegistered.v1", json!({ "id": "s-1" }))
//!     .with_tag(Tag::new("studentEmail", "a@x").unwrap());
//!
//! assert_eq!(event.event_type(), "StudentRegistered.v1");
//! assert_eq!(event.tags().len(), 1);
//! ```

use crate::tag::Tag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata carried alongside an event, entirely optional and never
/// interpreted by the store itself.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// When the event was created. Defaults to the time of append if unset.
    pub timestamp: Option<DateTime<Utc>>,
    /// Links events that are part of the same logical operation across streams.
    pub correlation_id: Option<String>,
    /// Links an event to the event that caused it.
    pub causation_id: Option<String>,
    /// Identifies the specific decision/command invocation that produced the event.
    pub operation_id: Option<String>,
    /// The user who triggered the event, if any.
    pub user_id: Option<String>,
}

impl EventMetadata {
    /// An empty metadata record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// A new event to be appended, not yet assigned a position.
///
/// Construct with [`NewEvent::new`] and attach tags with [`NewEvent::with_tag`]
/// / [`NewEvent::with_tags`]. There is no hidden conversion from a caller's
/// domain type: the caller is responsible for naming the event's
/// `event_type` and serializing its payload to JSON before constructing this
/// value (see §9: "Implicit conversions / fluent builders").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    event_type: String,
    payload: serde_json::Value,
    tags: Vec<Tag>,
    metadata: EventMetadata,
}

impl NewEvent {
    /// Start building a new event with the given stable type name and
    /// opaque JSON payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            tags: Vec::new(),
            metadata: EventMetadata::new(),
        }
    }

    /// Attach a single tag. Duplicate `(key, value)` pairs are permitted
    /// (documented relaxation, see design notes §9.2) and preserved in
    /// insertion order.
    #[must_use]
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Attach multiple tags at once, preserving their order.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Attach metadata, replacing any metadata set so far.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// The event's stable type identifier.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The event's opaque JSON payload.
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// The tags attached to this event, in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// The metadata attached to this event.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Assign a position, producing the [`SequencedEvent`] form persisted by
    /// the store. Called only by the store's append pipeline.
    #[must_use]
    pub fn into_sequenced(self, position: u64) -> SequencedEvent {
        SequencedEvent {
            position,
            event_type: self.event_type,
            payload: self.payload,
            tags: self.tags,
            metadata: self.metadata,
        }
    }
}

/// An event as read back from the store: a [`NewEvent`] plus its globally
/// unique, strictly increasing `position`.
///
/// Positions start at 1. Gaps are permitted (see design notes §4.5): an
/// allocated position whose write aborted before ledger commit is never
/// reused for a *committed* event, but the orphaned allocation itself may be
/// silently reassigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// The globally unique, strictly increasing sequence position.
    pub position: u64,
    event_type: String,
    payload: serde_json::Value,
    tags: Vec<Tag>,
    metadata: EventMetadata,
}

impl SequencedEvent {
    /// Construct a sequenced event directly (used by the store when
    /// materializing from disk).
    #[must_use]
    pub fn new(
        position: u64,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        tags: Vec<Tag>,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            position,
            event_type: event_type.into(),
            payload,
            tags,
            metadata,
        }
    }

    /// The event's stable type identifier.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The event's opaque JSON payload.
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// The tags attached to this event, in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// The metadata attached to this event.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Append additional tags to this event, in place.
    ///
    /// This is the only mutation permitted on an already-written event (see
    /// the "additive tag maintenance" invariant in §3). It does not
    /// deduplicate against existing tags.
    pub fn add_tags(&mut self, tags: impl IntoIterator<Item = Tag>) {
        self.tags.extend(tags);
    }
}
