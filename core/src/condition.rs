//! `AppendCondition`: the DCB optimistic-concurrency predicate.
//!
//! An append condition is evaluated **inside** the store's append mutex
//! (§4.1): it fails the append iff an event matching `fail_if_events_match`
//! exists with `position > after_sequence_position`. This is the sole
//! mechanism by which a decision made from a prior read is invalidated by a
//! concurrent writer.

use crate::query::Query;
use serde::{Deserialize, Serialize};

/// A predicate checked against committed events at the start of an append.
///
/// `after_sequence_position = None` means "check from the beginning of the
/// log"; `fail_if_events_match = Query::all()` (the default) combined with
/// `after_sequence_position = None` would fail on *any* prior event, so
/// callers typically narrow `fail_if_events_match` to the query they used to
/// build their decision.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendCondition {
    /// The predicate that must find no matches for the append to succeed.
    pub fail_if_events_match: Query,
    /// Only events with position strictly greater than this are considered;
    /// `None` means consider the whole log.
    pub after_sequence_position: Option<u64>,
}

impl AppendCondition {
    /// Build a condition from a query and the position a prior read
    /// observed as its maximum match (or `None` if that read was empty).
    #[must_use]
    pub fn new(fail_if_events_match: Query, after_sequence_position: Option<u64>) -> Self {
        Self {
            fail_if_events_match,
            after_sequence_position,
        }
    }

    /// A condition that never fails (its query matches nothing meaningful to
    /// check because the caller does not want optimistic concurrency). Not
    /// the default; prefer constructing an explicit condition from a
    /// decision model in production code.
    #[must_use]
    pub fn none() -> Option<Self> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryItem;

    #[test]
    fn new_sets_fields() {
        let query = Query::single(QueryItem::any().with_event_types(["X"]));
        let condition = AppendCondition::new(query.clone(), Some(5));

        assert_eq!(condition.fail_if_events_match, query);
        assert_eq!(condition.after_sequence_position, Some(5));
    }

    #[test]
    fn none_constructor_returns_none() {
        assert!(AppendCondition::none().is_none());
    }
}
