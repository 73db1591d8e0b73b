//! `ReadModelProjection`: the definition a caller registers with the
//! projection daemon (§4.7).
//!
//! Unlike `dcb_core::decision::ProjectionDefinition` (an in-memory fold used
//! once per decision), a `ReadModelProjection` is long-lived, keyed, and
//! persisted incrementally by the daemon across many poll ticks.

use dcb_core::event::SequencedEvent;
use dcb_core::tag::Tag;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A keyed, persisted read model folded from a subset of the event log.
///
/// `apply` returning `None` deletes the keyed state (§4.7): a projection can
/// model "this entity no longer exists" without a separate tombstone type.
pub trait ReadModelProjection: Send + Sync {
    /// The persisted state type for one key.
    type State: Serialize + DeserializeOwned + Clone + Send + Sync;

    /// The projection's stable name; becomes its directory under
    /// `projections/`.
    fn name(&self) -> &str;

    /// The event types this projection folds; events of any other type are
    /// skipped without invoking `apply`.
    fn event_types(&self) -> &[String];

    /// Extract the key this event's update applies to.
    fn key_selector(&self, event: &SequencedEvent) -> String;

    /// Fold `event` onto `current` (absent on first match for a key).
    /// Returning `None` deletes the key's state.
    fn apply(&self, current: Option<Self::State>, event: &SequencedEvent) -> Option<Self::State>;

    /// Tags to index a state under, if this projection maintains a tag
    /// index. Returning an empty vec (the default) means no tag index is
    /// maintained for this projection.
    fn tags(&self, _state: &Self::State) -> Vec<Tag> {
        Vec::new()
    }
}
