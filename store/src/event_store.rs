//! `FileEventStore`: the file-system-backed `dcb_core::store::EventStore`.
//!
//! The append path is the one piece of this crate with a true critical
//! section (§4.1): it holds a single process-wide async mutex across
//! condition-check, position allocation, event-file writes, index updates,
//! and the ledger commit. Reads never take this lock — they resolve against
//! whatever the indices and ledger show at the moment they run, which is
//! exactly the consistency model DCB promises (a read is a snapshot; only an
//! append's own condition check is linearized against other appends).

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::event_file_store::EventFileStore;
use crate::index::IndexStore;
use crate::ledger::{Ledger, LedgerRecord};
use crate::paths::StoreLayout;
use crate::query_engine;
use dcb_core::condition::AppendCondition;
use dcb_core::event::{NewEvent, SequencedEvent};
use dcb_core::query::Query;
use dcb_core::store::{EventStore, EventStoreError, ReadOptions};
use dcb_core::tag::Tag;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// A `dcb_core::store::EventStore` backed by one file per event plus
/// sorted-position-list indices, all under `config.root_path`.
pub struct FileEventStore {
    layout: StoreLayout,
    ledger: Ledger,
    events: EventFileStore,
    indices: IndexStore,
    append_lock: Mutex<()>,
    config: StoreConfig,
}

impl FileEventStore {
    /// Open (creating if necessary) a store at `config.root_path` /
    /// `config.store_name`.
    ///
    /// Validates `config` (registering its `store_name` as this process's
    /// store identity), creates the store's directory layout if absent, and
    /// logs a warning for any event file found above the ledger's committed
    /// head — an orphaned allocation from a crash between the event write
    /// and the ledger commit, left in place rather than repaired (§9).
    ///
    /// # Errors
    ///
    /// [`StoreError::Configuration`] / [`StoreError::DuplicateStoreName`] if
    /// `config` fails validation; [`StoreError::Io`] if the layout cannot be
    /// created.
    #[instrument(skip(config), fields(store = %config.store_name))]
    pub async fn open(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let layout = StoreLayout::new(&config.root_path, &config.store_name);
        tokio::fs::create_dir_all(layout.events_dir()).await?;
        tokio::fs::create_dir_all(layout.event_type_index_dir()).await?;
        tokio::fs::create_dir_all(layout.tag_index_dir()).await?;

        let ledger = Ledger::new(layout.ledger_path());
        let head = ledger.load().await?.last_sequence_position;
        warn_on_orphaned_event_files(&layout, head).await?;

        info!(head, "opened store");

        Ok(Self {
            events: EventFileStore::new(layout.clone()),
            indices: IndexStore::new(layout.clone()),
            layout,
            ledger,
            append_lock: Mutex::new(()),
            config,
        })
    }

    /// The directory layout this store operates over.
    #[must_use]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    async fn resolve_positions(
        &self,
        query: &Query,
        from_position: u64,
        head: u64,
        direction: dcb_core::store::ReadDirection,
    ) -> Result<Vec<u64>, StoreError> {
        query_engine::resolve(&self.indices, query, from_position, head, direction).await
    }

    async fn materialize(&self, positions: &[u64]) -> Result<Vec<SequencedEvent>, StoreError> {
        let mut events = Vec::with_capacity(positions.len());
        for position in positions {
            let event = self
                .events
                .read(*position)
                .await?
                .ok_or(StoreError::PositionNotFound(*position))?;
            events.push(event);
        }
        Ok(events)
    }

    async fn append_impl(
        &self,
        events: Vec<NewEvent>,
        condition: Option<AppendCondition>,
    ) -> Result<(), StoreError> {
        let _guard = self.append_lock.lock().await;

        let ledger_record = self.ledger.load().await?;
        let head = ledger_record.last_sequence_position;

        if let Some(condition) = &condition {
            let from = condition.after_sequence_position.unwrap_or(0);
            let matches = self
                .resolve_positions(
                    &condition.fail_if_events_match,
                    from,
                    head,
                    dcb_core::store::ReadDirection::Ascending,
                )
                .await?;
            if !matches.is_empty() {
                return Err(StoreError::AppendConditionFailed);
            }
        }

        if events.is_empty() {
            return Ok(());
        }

        let mut next_position = head;
        let mut written = Vec::with_capacity(events.len());
        for event in events {
            next_position += 1;
            let sequenced = event.into_sequenced(next_position);
            self.events
                .write(
                    &sequenced,
                    self.config.write_protect_event_files,
                    self.config.flush_events_immediately,
                )
                .await?;
            written.push(sequenced);
        }

        for sequenced in &written {
            self.indices
                .add_to_type_index(sequenced.event_type(), sequenced.position)
                .await?;
            for tag in sequenced.tags() {
                self.indices.add_to_tag_index(tag, sequenced.position).await?;
            }
        }

        self.ledger
            .commit(LedgerRecord {
                last_sequence_position: next_position,
                event_count: ledger_record.event_count + written.len() as u64,
            })
            .await?;

        info!(
            from = head + 1,
            to = next_position,
            count = written.len(),
            "appended events"
        );
        Ok(())
    }

    async fn read_impl(
        &self,
        query: Query,
        options: ReadOptions,
        from_position: Option<u64>,
    ) -> Result<Vec<SequencedEvent>, StoreError> {
        let head = self.ledger.load().await?.last_sequence_position;
        let positions = self
            .resolve_positions(&query, from_position.unwrap_or(0), head, options.direction)
            .await?;
        self.materialize(&positions).await
    }

    async fn add_tags_impl(&self, position: u64, tags: Vec<Tag>) -> Result<(), StoreError> {
        let _guard = self.append_lock.lock().await;

        let mut sequenced = self
            .events
            .read(position)
            .await?
            .ok_or(StoreError::PositionNotFound(position))?;
        sequenced.add_tags(tags.clone());
        self.events
            .write(
                &sequenced,
                self.config.write_protect_event_files,
                self.config.flush_events_immediately,
            )
            .await?;

        for tag in &tags {
            self.indices.add_to_tag_index(tag, position).await?;
        }
        Ok(())
    }
}

async fn warn_on_orphaned_event_files(layout: &StoreLayout, head: u64) -> Result<(), StoreError> {
    let events_dir = layout.events_dir();
    let mut entries = tokio::fs::read_dir(&events_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str().map(str::to_string))
        else {
            continue;
        };
        if let Ok(position) = stem.parse::<u64>() {
            if position > head {
                warn!(
                    position,
                    head, "orphaned event file above ledger head, left in place"
                );
            }
        }
    }
    Ok(())
}

impl EventStore for FileEventStore {
    fn append(
        &self,
        events: Vec<NewEvent>,
        condition: Option<AppendCondition>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.append_impl(events, condition).await?) })
    }

    fn read(
        &self,
        query: Query,
        options: ReadOptions,
        from_position: Option<u64>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<SequencedEvent>, EventStoreError>> + Send + '_>>
    {
        Box::pin(async move { Ok(self.read_impl(query, options, from_position).await?) })
    }

    fn add_tags(
        &self,
        position: u64,
        tags: Vec<Tag>,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventStoreError>> + Send + '_>> {
        Box::pin(async move { Ok(self.add_tags_impl(position, tags).await?) })
    }
}
