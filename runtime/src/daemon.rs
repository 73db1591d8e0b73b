//! The projection daemon: a single polling loop per process that folds
//! committed events into every registered [`ReadModelProjection`]'s keyed,
//! tag-indexed state (§4.8).

use crate::config::ProjectionsConfig;
use crate::error::{Result, RuntimeError};
use chrono::Utc;
use dcb_core::event::SequencedEvent;
use dcb_core::query::Query;
use dcb_core::store::{EventStore, ReadOptions};
use dcb_projections::{Checkpoint, ProjectionStore, ReadModelProjection};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Semaphore};

/// The object-safe surface the daemon drives a registered projection
/// through, independent of its associated `State` type.
///
/// Implemented for every [`Registered<P>`]; callers never implement this
/// trait directly — they implement [`ReadModelProjection`] and register it
/// with [`ProjectionDaemon::register`].
trait ProjectionRunner: Send + Sync {
    fn name(&self) -> &str;

    fn event_types(&self) -> &[String];

    fn last_processed_position(&self) -> Pin<Box<dyn Future<Output = u64> + Send + '_>>;

    fn fold_event<'a>(
        &'a self,
        event: &'a SequencedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn persist_checkpoint(
        &self,
        position: u64,
        events_folded: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn rebuild<'a>(
        &'a self,
        store: &'a dyn EventStore,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Binds one caller-supplied [`ReadModelProjection`] to its
/// [`ProjectionStore`] and persisted [`Checkpoint`], tracked in memory
/// between poll ticks and guarded against a concurrent rebuild.
struct Registered<P: ReadModelProjection> {
    projection: P,
    store: ProjectionStore<P>,
    checkpoint_path: PathBuf,
    checkpoint: Mutex<Checkpoint>,
}

impl<P: ReadModelProjection> Registered<P> {
    async fn load(projection: P, projections_root: &Path) -> Result<Self> {
        let store = ProjectionStore::new(projections_root, &projection);
        let checkpoint_path = store.layout().checkpoint_path();
        let checkpoint = Checkpoint::load(&checkpoint_path, projection.name(), Utc::now()).await?;
        Ok(Self {
            projection,
            store,
            checkpoint_path,
            checkpoint: Mutex::new(checkpoint),
        })
    }
}

impl<P: ReadModelProjection> ProjectionRunner for Registered<P> {
    fn name(&self) -> &str {
        self.projection.name()
    }

    fn event_types(&self) -> &[String] {
        self.projection.event_types()
    }

    fn last_processed_position(&self) -> Pin<Box<dyn Future<Output = u64> + Send + '_>> {
        Box::pin(async move { self.checkpoint.lock().await.last_processed_position })
    }

    fn fold_event<'a>(
        &'a self,
        event: &'a SequencedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let key = self.projection.key_selector(event);
            let current = self.store.get(&key).await?;
            match self.projection.apply(current, event) {
                Some(state) => self.store.save(&self.projection, &key, state).await?,
                None => self.store.delete(&self.projection, &key).await?,
            }
            let mut checkpoint = self.checkpoint.lock().await;
            checkpoint.advance(event.position, 1, Utc::now());
            Ok(())
        })
    }

    fn persist_checkpoint(
        &self,
        position: u64,
        events_folded: u64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let mut checkpoint = self.checkpoint.lock().await;
            if events_folded > 0 {
                checkpoint.advance(position.max(checkpoint.last_processed_position), 0, Utc::now());
            }
            checkpoint.save(&self.checkpoint_path).await?;
            Ok(())
        })
    }

    fn rebuild<'a>(
        &'a self,
        store: &'a dyn EventStore,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let start = std::time::Instant::now();
            self.store.clear().await?;
            {
                let mut checkpoint = self.checkpoint.lock().await;
                checkpoint.reset(Utc::now());
                checkpoint.save(&self.checkpoint_path).await?;
            }

            let query = Query::single(
                dcb_core::query::QueryItem::any()
                    .with_event_types(self.projection.event_types().iter().cloned()),
            );
            let events = store.read(query, ReadOptions::ascending(), None).await?;
            for event in &events {
                self.fold_event(event).await?;
            }
            let max_position = events.last().map(|event| event.position).unwrap_or(0);
            self.persist_checkpoint(max_position, events.len() as u64)
                .await?;

            metrics::histogram!("dcb_daemon_rebuild_duration_seconds")
                .record(start.elapsed().as_secs_f64());
            tracing::info!(
                projection = self.name(),
                events = events.len(),
                "rebuilt projection"
            );
            Ok(())
        })
    }
}

/// Shutdown signal for [`ProjectionDaemon::run`]: send `true` to stop the
/// loop after its current poll tick.
pub type ShutdownSignal = watch::Receiver<bool>;

/// Drives every registered projection through §4.8's polling loop: read the
/// union of events since the oldest checkpoint, fold matching events into
/// each projection in position order, persist checkpoints, sleep.
pub struct ProjectionDaemon {
    store: Arc<dyn EventStore>,
    projections_root: PathBuf,
    config: ProjectionsConfig,
    runners: Vec<Box<dyn ProjectionRunner>>,
}

impl ProjectionDaemon {
    /// Build a daemon bound to `store`, with projection state rooted at
    /// `projections_root` (typically `dcb_store::StoreLayout::projections_dir()`).
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Configuration`] if `config` fails validation.
    pub fn new(
        store: Arc<dyn EventStore>,
        projections_root: PathBuf,
        config: ProjectionsConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|err| RuntimeError::Configuration(err.to_string()))?;
        Ok(Self {
            store,
            projections_root,
            config,
            runners: Vec::new(),
        })
    }

    /// Register a projection with the daemon, loading (or initializing) its
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Propagates [`dcb_projections::ProjectionError`] from loading the
    /// checkpoint.
    pub async fn register<P: ReadModelProjection + 'static>(&mut self, projection: P) -> Result<()> {
        let registered = Registered::load(projection, &self.projections_root).await?;
        self.runners.push(Box::new(registered));
        Ok(())
    }

    /// Run one poll iteration: read events since the oldest registered
    /// checkpoint, fold matching events into each projection, persist
    /// checkpoints. Returns the number of events read.
    ///
    /// # Errors
    ///
    /// Propagates store or projection errors encountered while folding.
    pub async fn poll_once(&self) -> Result<usize> {
        let start = std::time::Instant::now();

        let mut min_checkpoint = u64::MAX;
        for runner in &self.runners {
            min_checkpoint = min_checkpoint.min(runner.last_processed_position().await);
        }
        if self.runners.is_empty() {
            min_checkpoint = 0;
        }

        let mut events = self
            .store
            .read(Query::all(), ReadOptions::ascending(), Some(min_checkpoint))
            .await
            .map_err(RuntimeError::Store)?;
        events.truncate(self.config.batch_size);

        let mut folded_per_runner = vec![0u64; self.runners.len()];
        for event in &events {
            for (index, runner) in self.runners.iter().enumerate() {
                let checkpoint_position = runner.last_processed_position().await;
                if event.position <= checkpoint_position {
                    continue;
                }
                if runner
                    .event_types()
                    .iter()
                    .any(|event_type| event_type == event.event_type())
                {
                    runner.fold_event(event).await?;
                    folded_per_runner[index] += 1;
                }
            }
        }

        for (runner, folded) in self.runners.iter().zip(folded_per_runner) {
            if folded > 0 {
                let position = runner.last_processed_position().await;
                runner.persist_checkpoint(position, folded).await?;
            }
        }

        metrics::counter!("dcb_daemon_poll_ticks_total").increment(1);
        metrics::counter!("dcb_daemon_events_folded_total").increment(events.len() as u64);
        metrics::histogram!("dcb_daemon_poll_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        Ok(events.len())
    }

    /// Run the polling loop until `shutdown` is signalled true.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`ProjectionDaemon::poll_once`]; the loop
    /// does not continue past a failed tick.
    pub async fn run(&self, mut shutdown: ShutdownSignal) -> Result<()> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }
            if let Err(err) = self.poll_once().await {
                tracing::error!(error = %err, "projection daemon poll tick failed, stopping");
                return Err(err);
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.polling_interval) => {}
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Destructively rebuild a single registered projection by name:
    /// clear its state and tag index, reset its checkpoint, and replay the
    /// whole log from position 1 (§4.8).
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Configuration`] if no projection named `name` is
    /// registered; otherwise propagates store or projection errors.
    pub async fn rebuild(&self, name: &str) -> Result<()> {
        let runner = self
            .runners
            .iter()
            .find(|runner| runner.name() == name)
            .ok_or_else(|| RuntimeError::Configuration(format!("no projection named '{name}'")))?;
        runner.rebuild(self.store.as_ref()).await
    }

    /// Rebuild every registered projection, bounded by
    /// `config.max_concurrent_rebuilds` concurrent rebuilds at a time
    /// (§4.8).
    ///
    /// # Errors
    ///
    /// The first rebuild failure encountered; other in-flight rebuilds are
    /// still awaited to completion before returning.
    pub async fn rebuild_all(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_rebuilds));
        let mut handles = Vec::with_capacity(self.runners.len());

        for runner in &self.runners {
            let semaphore = Arc::clone(&semaphore);
            let store = self.store.as_ref();
            handles.push(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("semaphore is never closed");
                runner.rebuild(store).await
            });
        }

        let results = futures::future::join_all(handles).await;
        for result in results {
            result?;
        }
        Ok(())
    }
}
