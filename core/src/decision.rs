//! The Decision Model layer: composing independent projections into a single
//! read, folding matching events per sub-projection, and deriving the
//! `AppendCondition` that protects the resulting decision (§4.6).
//!
//! # Example
//!
//! ```
//! use dcb_core::decision::{build_decision_model, ProjectionDefinition};
//! use dcb_core::query::{Query, QueryItem};
//! # use dcb_core::store::{EventStore, EventStoreError, ReadOptions};
//! # use dcb_core::event::{NewEvent, SequencedEvent};
//! # use dcb_core::condition::AppendCondition;
//! # use dcb_core::tag::Tag;
//! # use std::future::Future;
//! # use std::pin::Pin;
//! # use std::sync::Mutex;
//! # struct InMemoryStore(Mutex<Vec<SequencedEvent>>);
//! # impl EventStore for InMemoryStore {
//! #     fn append(&self, events: Vec<NewEvent>, _c: Option<AppendCondition>)
//! #         -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
//! #         Box::pin(async move {
//! #             let mut guard = self.0.lock().unwrap();
//! #             for e in events {
//! #                 let pos = guard.len() as u64 + 1;
//! #                 guard.push(e.into_sequenced(pos));
//! #             }
//! #             Ok(())
//! #         })
//! #     }
//! #     fn read(&self, query: Query, _o: ReadOptions, from: Option<u64>)
//! #         -> Pin<Box<dyn Future<Output = Result<Vec<SequencedEvent>, EventStoreError>> + Send + '_>> {
//! #         Box::pin(async move {
//! #             let guard = self.0.lock().unwrap();
//! #             Ok(guard.iter().filter(|e| from.is_none_or(|f| e.position > f) && query.matches(e)).cloned().collect())
//! #         })
//! #     }
//! #     fn add_tags(&self, _p: u64, _t: Vec<Tag>) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
//! #         Box::pin(async move { Ok(()) })
//! #     }
//! # }
//! # async fn run() {
//! let store = InMemoryStore(Mutex::new(Vec::new()));
//! let email_not_taken = ProjectionDefinition::new(
//!     true,
//!     Query::single(QueryItem::any().with_event_types(["StudentRegistered.v1"])
//!         .with_tag(Tag::new("studentEmail", "a@x").unwrap())),
//!     |_taken, _event| false,
//! );
//!
//! let (is_free, condition) = build_decision_model(&store, (email_not_taken,)).await.unwrap();
//! assert!(is_free);
//! assert!(condition.after_sequence_position.is_none());
//! # }
//! ```

use crate::condition::AppendCondition;
use crate::event::SequencedEvent;
use crate::query::Query;
use crate::store::{EventStore, EventStoreError, ReadOptions};

/// A single decision-model projection: an in-memory fold over events matching
/// `query`, discarded after one append (contrast with the persisted,
/// checkpointed projections in `dcb-projections`).
///
/// Construct via a factory function parameterized by the decision at hand,
/// e.g. `fn email_not_taken(email: &str) -> ProjectionDefinition<bool>`.
pub struct ProjectionDefinition<S> {
    /// The sub-query this projection folds over.
    pub query: Query,
    initial_state: S,
    apply: Box<dyn Fn(S, &SequencedEvent) -> S + Send + Sync>,
}

impl<S> ProjectionDefinition<S> {
    /// Construct a projection definition from its initial state, query, and
    /// fold function.
    pub fn new(
        initial_state: S,
        query: Query,
        apply: impl Fn(S, &SequencedEvent) -> S + Send + Sync + 'static,
    ) -> Self {
        Self {
            query,
            initial_state,
            apply: Box::new(apply),
        }
    }

    /// Fold `events` into this projection's state, applying `apply` only to
    /// events this projection's query matches (§4.6 step 3). `events` is
    /// assumed to already be in ascending position order, as returned by
    /// [`EventStore::read`].
    fn fold(self, events: &[SequencedEvent]) -> S {
        let Self {
            query,
            initial_state,
            apply,
        } = self;
        events.iter().fold(initial_state, |state, event| {
            if query.matches(event) {
                apply(state, event)
            } else {
                state
            }
        })
    }
}

/// A tuple of [`ProjectionDefinition`]s whose queries can be unioned into a
/// single read and whose states fold independently from the same event
/// batch. Implemented for tuples of 1 to 4 projections; larger decision
/// models should be composed by nesting or by folding a `Vec` manually.
pub trait DecisionModelProjections {
    /// The tuple of resulting states, one per projection, in declaration order.
    type States;

    /// The union of every sub-projection's query (§4.6 step 1).
    fn union_query(&self) -> Query;

    /// Fold `events` into every sub-projection's state independently.
    fn fold_all(self, events: &[SequencedEvent]) -> Self::States;
}

impl<S1> DecisionModelProjections for (ProjectionDefinition<S1>,) {
    type States = (S1,);

    fn union_query(&self) -> Query {
        self.0.query.clone()
    }

    fn fold_all(self, events: &[SequencedEvent]) -> Self::States {
        (self.0.fold(events),)
    }
}

impl<S1, S2> DecisionModelProjections for (ProjectionDefinition<S1>, ProjectionDefinition<S2>) {
    type States = (S1, S2);

    fn union_query(&self) -> Query {
        self.0.query.clone().union(self.1.query.clone())
    }

    fn fold_all(self, events: &[SequencedEvent]) -> Self::States {
        (self.0.fold(events), self.1.fold(events))
    }
}

impl<S1, S2, S3> DecisionModelProjections
    for (
        ProjectionDefinition<S1>,
        ProjectionDefinition<S2>,
        ProjectionDefinition<S3>,
    )
{
    type States = (S1, S2, S3);

    fn union_query(&self) -> Query {
        Query::union_all([
            self.0.query.clone(),
            self.1.query.clone(),
            self.2.query.clone(),
        ])
    }

    fn fold_all(self, events: &[SequencedEvent]) -> Self::States {
        (
            self.0.fold(events),
            self.1.fold(events),
            self.2.fold(events),
        )
    }
}

impl<S1, S2, S3, S4> DecisionModelProjections
    for (
        ProjectionDefinition<S1>,
        ProjectionDefinition<S2>,
        ProjectionDefinition<S3>,
        ProjectionDefinition<S4>,
    )
{
    type States = (S1, S2, S3, S4);

    fn union_query(&self) -> Query {
        Query::union_all([
            self.0.query.clone(),
            self.1.query.clone(),
            self.2.query.clone(),
            self.3.query.clone(),
        ])
    }

    fn fold_all(self, events: &[SequencedEvent]) -> Self::States {
        (
            self.0.fold(events),
            self.1.fold(events),
            self.2.fold(events),
            self.3.fold(events),
        )
    }
}

/// Build an N-way decision model: read the union of every sub-projection's
/// query once, fold each sub-projection independently over the events it
/// matches, and derive the `AppendCondition` that protects the resulting
/// decision (§4.6).
///
/// The returned condition's `after_sequence_position` is the maximum
/// position observed in the read (or `None` if the read was empty), and its
/// `fail_if_events_match` is the same union query — so any event a
/// sub-projection would have folded in, appended concurrently after this
/// read, invalidates the decision.
///
/// # Errors
///
/// Propagates any [`EventStoreError`] from the underlying read.
pub async fn build_decision_model<P: DecisionModelProjections>(
    store: &dyn EventStore,
    projections: P,
) -> Result<(P::States, AppendCondition), EventStoreError> {
    let union_query = projections.union_query();
    let events = store
        .read(union_query.clone(), ReadOptions::ascending(), None)
        .await?;
    let max_position = events.last().map(|event| event.position);
    let states = projections.fold_all(&events);
    let condition = AppendCondition::new(union_query, max_position);
    Ok((states, condition))
}
