//! `Query` / `QueryItem`: the boolean algebra over event types and tags.
//!
//! A [`Query`] is an OR across its [`QueryItem`]s; within one item, event-type
//! membership and tag membership are ANDed together. This is both the
//! predicate resolved against the on-disk indices by the query engine (in
//! `dcb-store`) and the in-memory matcher used by the decision-model layer to
//! route already-read events to the right sub-projection without a second
//! read (§4.4: "an in-memory `Query.Matches` MUST exist with semantics
//! identical to the index-based resolve").

use crate::event::SequencedEvent;
use crate::tag::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One clause of a [`Query`]: matches an event iff its `event_types` set is
/// empty or contains the event's type, AND every tag in `tags` is present on
/// the event.
///
/// An item with both sets empty matches every event (`QueryItem::any()`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    event_types: BTreeSet<String>,
    tags: BTreeSet<Tag>,
}

impl QueryItem {
    /// A query item that matches any event (empty type set, empty tag set).
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Restrict this item to one or more event types (OR'd with each other,
    /// ANDed with the tag constraints).
    #[must_use]
    pub fn with_event_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.event_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Require a tag to be present on matching events.
    #[must_use]
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Require a set of tags to all be present on matching events.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// The event types this item restricts to; empty means "any type".
    #[must_use]
    pub fn event_types(&self) -> &BTreeSet<String> {
        &self.event_types
    }

    /// The tags this item requires; empty means "any tags".
    #[must_use]
    pub fn required_tags(&self) -> &BTreeSet<Tag> {
        &self.tags
    }

    /// Whether this is the unconstrained wildcard item (`any()`).
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.event_types.is_empty() && self.tags.is_empty()
    }

    /// In-memory match against a single event, with identical semantics to
    /// the index-based resolution the query engine performs on disk.
    #[must_use]
    pub fn matches(&self, event: &SequencedEvent) -> bool {
        let type_ok = self.event_types.is_empty() || self.event_types.contains(event.event_type());
        let tags_ok = self
            .tags
            .iter()
            .all(|required| event.tags().contains(required));
        type_ok && tags_ok
    }
}

/// An ordered list of [`QueryItem`]s, matching an event iff any item matches
/// (logical OR). The empty query ([`Query::all`]) matches every event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    items: Vec<QueryItem>,
}

impl Query {
    /// The query that matches every event (zero items).
    #[must_use]
    pub fn all() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a query from an explicit list of items.
    #[must_use]
    pub fn new(items: Vec<QueryItem>) -> Self {
        Self { items }
    }

    /// A single-item query, a common case for projection definitions.
    #[must_use]
    pub fn single(item: QueryItem) -> Self {
        Self { items: vec![item] }
    }

    /// The items of this query.
    #[must_use]
    pub fn items(&self) -> &[QueryItem] {
        &self.items
    }

    /// Whether this is `Query::all()` (matches every event with no index
    /// lookup required).
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.items.is_empty()
    }

    /// In-memory match: true iff any item matches. Mirrors the index-based
    /// resolve performed by the query engine.
    #[must_use]
    pub fn matches(&self, event: &SequencedEvent) -> bool {
        self.is_all() || self.items.iter().any(|item| item.matches(event))
    }

    /// Union this query with another: concatenates items; if either side is
    /// `Query::all()`, the union is `Query::all()` (§4.6 step 1).
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.is_all() || other.is_all() {
            return Self::all();
        }
        let mut items = self.items;
        items.extend(other.items);
        Self { items }
    }

    /// Union a collection of queries in order, short-circuiting to
    /// `Query::all()` as soon as any sub-query is `Query::all()`.
    #[must_use]
    pub fn union_all(queries: impl IntoIterator<Item = Self>) -> Self {
        let mut result = Self::all();
        let mut any_all_seen = false;
        let mut items = Vec::new();
        for query in queries {
            if query.is_all() {
                any_all_seen = true;
                continue;
            }
            items.extend(query.items);
        }
        if any_all_seen {
            return Self::all();
        }
        result.items = items;
        result
    }
}
