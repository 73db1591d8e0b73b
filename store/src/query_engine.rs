//! Resolves a [`Query`] against the on-disk indices into a list of
//! positions, without reading any event file (§4.4).
//!
//! `Query::all()` and a `QueryItem::any()` clause both resolve to the full
//! numeric range above `from_position`, produced directly from the ledger's
//! head rather than by touching an index. Descending order is applied by
//! reversing the already-resolved, already-sorted position list — it is
//! never a separate re-scan.

use crate::error::StoreError;
use crate::index::IndexStore;
use dcb_core::query::{Query, QueryItem};
use dcb_core::store::ReadDirection;
use std::collections::BTreeSet;

/// Resolve `query` against `indices`, returning positions strictly greater
/// than `from_position` and at most `head`, ordered per `direction`.
///
/// # Errors
///
/// [`StoreError::Io`] / [`StoreError::Json`] if an index file cannot be read.
pub async fn resolve(
    indices: &IndexStore,
    query: &Query,
    from_position: u64,
    head: u64,
    direction: ReadDirection,
) -> Result<Vec<u64>, StoreError> {
    let mut positions = if query.is_all() {
        full_range(from_position, head)
    } else {
        let mut union = BTreeSet::new();
        for item in query.items() {
            union.extend(resolve_item(indices, item, from_position, head).await?);
        }
        union.into_iter().collect()
    };

    if direction == ReadDirection::Descending {
        positions.reverse();
    }
    Ok(positions)
}

async fn resolve_item(
    indices: &IndexStore,
    item: &QueryItem,
    from_position: u64,
    head: u64,
) -> Result<Vec<u64>, StoreError> {
    let types_empty = item.event_types().is_empty();
    let tags_empty = item.required_tags().is_empty();

    if types_empty && tags_empty {
        return Ok(full_range(from_position, head));
    }

    let type_positions = if types_empty {
        None
    } else {
        let mut union = BTreeSet::new();
        for event_type in item.event_types() {
            union.extend(indices.type_positions(event_type).await?);
        }
        Some(union)
    };

    let tag_positions = if tags_empty {
        None
    } else {
        let mut tags = item.required_tags().iter();
        let first = tags
            .next()
            .expect("required_tags non-empty checked above");
        let mut intersection: BTreeSet<u64> =
            indices.tag_positions(first).await?.into_iter().collect();
        for tag in tags {
            let next: BTreeSet<u64> = indices.tag_positions(tag).await?.into_iter().collect();
            intersection = intersection.intersection(&next).copied().collect();
            if intersection.is_empty() {
                break;
            }
        }
        Some(intersection)
    };

    let resolved = match (type_positions, tag_positions) {
        (Some(types), Some(tags)) => types.intersection(&tags).copied().collect(),
        (Some(types), None) => types,
        (None, Some(tags)) => tags,
        (None, None) => unreachable!("handled by the types_empty && tags_empty branch above"),
    };

    Ok(resolved
        .into_iter()
        .filter(|position| *position > from_position && *position <= head)
        .collect())
}

fn full_range(from_position: u64, head: u64) -> Vec<u64> {
    if head <= from_position {
        Vec::new()
    } else {
        ((from_position + 1)..=head).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::StoreLayout;
    use dcb_core::tag::Tag;

    async fn seeded_indices(dir: &std::path::Path) -> IndexStore {
        let indices = IndexStore::new(StoreLayout::new(dir, "s"));
        indices.add_to_type_index("A", 1).await.unwrap();
        indices.add_to_type_index("B", 2).await.unwrap();
        indices.add_to_type_index("A", 3).await.unwrap();
        indices
            .add_to_tag_index(&Tag::new("k", "v").unwrap(), 1)
            .await
            .unwrap();
        indices
            .add_to_tag_index(&Tag::new("k", "v").unwrap(), 2)
            .await
            .unwrap();
        indices
    }

    #[tokio::test]
    async fn query_all_returns_full_range() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let positions = resolve(&indices, &Query::all(), 0, 3, ReadDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn query_all_respects_from_position() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let positions = resolve(&indices, &Query::all(), 1, 3, ReadDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(positions, vec![2, 3]);
    }

    #[tokio::test]
    async fn event_type_filter_unions_across_types() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let query = Query::single(QueryItem::any().with_event_types(["A", "B"]));
        let positions = resolve(&indices, &query, 0, 3, ReadDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn tag_filter_intersects_across_tags() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let query = Query::single(QueryItem::any().with_tag(Tag::new("k", "v").unwrap()));
        let positions = resolve(&indices, &query, 0, 3, ReadDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(positions, vec![1, 2]);
    }

    #[tokio::test]
    async fn type_and_tag_are_intersected_within_one_item() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let query = Query::single(
            QueryItem::any()
                .with_event_types(["A"])
                .with_tag(Tag::new("k", "v").unwrap()),
        );
        let positions = resolve(&indices, &query, 0, 3, ReadDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(positions, vec![1]);
    }

    #[tokio::test]
    async fn descending_reverses_the_resolved_list() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let positions = resolve(&indices, &Query::all(), 0, 3, ReadDirection::Descending)
            .await
            .unwrap();
        assert_eq!(positions, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn items_are_ored_across_a_query() {
        let dir = tempfile::tempdir().unwrap();
        let indices = seeded_indices(dir.path()).await;
        let query = Query::new(vec![
            QueryItem::any().with_event_types(["A"]),
            QueryItem::any().with_event_types(["B"]),
        ]);
        let positions = resolve(&indices, &query, 0, 3, ReadDirection::Ascending)
            .await
            .unwrap();
        assert_eq!(positions, vec![1, 2, 3]);
    }
}
