//! `proptest` strategies for the core domain types, used by this
//! workspace's property tests over strictly increasing positions,
//! `from_position` equivalence, and tag round-trips.

use dcb_core::event::NewEvent;
use dcb_core::tag::Tag;
use proptest::collection::vec;
use proptest::prelude::*;

/// A short, filesystem-friendly identifier: lowercase ASCII letters and
/// digits, 1-12 characters. Used for tag keys/values and event type
/// fragments, which all end up as path components on disk.
fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,11}"
}

/// One of a small fixed set of stable event type names, mirroring how a
/// real caller names types (`"Noun.vN"`).
pub fn event_type() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Registered.v1".to_string()),
        Just("Updated.v1".to_string()),
        Just("Cancelled.v1".to_string()),
        Just("Completed.v1".to_string()),
    ]
}

/// A single valid [`Tag`], built from [`identifier`] key/value pairs so
/// `Tag::new` never fails.
pub fn tag() -> impl Strategy<Value = Tag> {
    (identifier(), identifier()).prop_map(|(key, value)| {
        Tag::new(key, value).expect("identifier strategy never produces an empty part")
    })
}

/// Between 0 and 4 tags, not deduplicated — matching the store's documented
/// relaxation that duplicate `(key, value)` pairs on one event are
/// permitted.
pub fn tags() -> impl Strategy<Value = Vec<Tag>> {
    vec(tag(), 0..4)
}

/// A [`NewEvent`] with a random type, a small scalar JSON payload, and a
/// random tag set — enough variation to exercise indexing and query
/// resolution without payload content ever mattering to the store itself.
pub fn new_event() -> impl Strategy<Value = NewEvent> {
    (event_type(), any::<i64>(), tags()).prop_map(|(event_type, n, tags)| {
        NewEvent::new(event_type, serde_json::json!({ "n": n })).with_tags(tags)
    })
}

/// A batch of 1 to 20 [`NewEvent`]s, for exercising multi-event appends and
/// position allocation.
pub fn new_event_batch() -> impl Strategy<Value = Vec<NewEvent>> {
    vec(new_event(), 1..20)
}
