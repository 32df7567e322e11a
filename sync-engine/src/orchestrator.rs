//! SyncOrchestrator - the main interface of the engine.
//!
//! The orchestrator owns the pending queue and the in-flight set, runs the
//! active strategy under a concurrency bound, and publishes lifecycle
//! events.
//!
//! # Architecture
//!
//! ```text
//! caller ─┬─ synchronize ───────────────┐
//!         ├─ synchronize_batch ─ enqueue ┤
//!         └─ reconcile timer ── enqueue ┘
//!                                        ▼
//!                  SyncQueue (sync-core, behind one mutex)
//!                                        │ drain: up to max_concurrent_syncs
//!                                        ▼
//!                  tokio task ── SyncStrategy ── repositories
//!                                        │
//!                                        ▼
//!                  finish: clear in-flight, publish, drain again
//! ```
//!
//! The queue mutex is never held across an `.await` and no event is
//! published while it is held. Each operation captures the strategy once;
//! `set_strategy` only affects work started afterwards.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = SyncOrchestrator::new(&EngineConfig::default(), files, cloud);
//! let (observer, mut events) = ChannelObserver::new();
//! orchestrator.add_observer(observer.clone());
//!
//! let results = orchestrator.synchronize_all_pending().await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use chrono::Utc;
use sync_core::{conflict_copy_name, QueueError, SyncQueue};
use sync_types::{FileId, RepositoryError, StrategyKind, SyncError, SyncFile, SyncResult, SyncStatus};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::{EngineConfig, ReconcileConfig};
use crate::events::{
    EventBus, ObserverToken, ProgressSink, ScopedObserver, SyncEvent, SyncObserver,
};
use crate::factory::StrategyFactory;
use crate::reconcile::spawn_reconcile_task;
use crate::repository::{CloudRepository, FileRepository};
use crate::strategy::SyncStrategy;

/// How to settle a file in `Conflict` state.
#[derive(Debug, Clone)]
pub enum ConflictResolution {
    /// Upload the local copy over the remote one.
    KeepLocal,
    /// Replace the local copy with the remote one.
    KeepRemote,
    /// Keep the local content under a conflict-copy name, then take the
    /// remote copy.
    KeepBoth,
    /// Store this merged file and upload it.
    ManualMerge(SyncFile),
}

impl ConflictResolution {
    /// Short lowercase name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::KeepLocal => "keep_local",
            Self::KeepRemote => "keep_remote",
            Self::KeepBoth => "keep_both",
            Self::ManualMerge(_) => "manual_merge",
        }
    }
}

/// The sync engine.
///
/// Cheap to clone; clones share the queue, strategy and observers.
#[derive(Clone)]
pub struct SyncOrchestrator {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`SyncOrchestrator`].
#[derive(Clone)]
pub struct WeakOrchestrator {
    inner: Weak<Inner>,
}

impl WeakOrchestrator {
    /// The orchestrator, if it is still alive.
    pub fn upgrade(&self) -> Option<SyncOrchestrator> {
        self.inner.upgrade().map(|inner| SyncOrchestrator { inner })
    }
}

struct Inner {
    files: Arc<dyn FileRepository>,
    cloud: Arc<dyn CloudRepository>,
    factory: StrategyFactory,
    strategy: RwLock<Arc<dyn SyncStrategy>>,
    state: Mutex<QueueState>,
    events: Arc<EventBus>,
    progress: ProgressSink,
}

struct QueueState {
    queue: SyncQueue,
    /// The direct `synchronize` caller waiting on a queued file.
    waiters: HashMap<FileId, oneshot::Sender<SyncResult>>,
}

enum Admission {
    Started { pending: Option<usize> },
    Queued {
        rx: oneshot::Receiver<SyncResult>,
        pending: Option<usize>,
    },
}

impl SyncOrchestrator {
    /// Create an orchestrator from configuration.
    ///
    /// Uses the tokio delay scheduler and the configured selective filter.
    pub fn new(
        config: &EngineConfig,
        files: Arc<dyn FileRepository>,
        cloud: Arc<dyn CloudRepository>,
    ) -> Self {
        let factory = StrategyFactory::new().with_filter(config.selective.clone());
        Self::with_factory(config, files, cloud, factory)
    }

    /// Create an orchestrator building strategies with `factory`.
    ///
    /// The factory's own filter applies; `config.selective` is ignored.
    pub fn with_factory(
        config: &EngineConfig,
        files: Arc<dyn FileRepository>,
        cloud: Arc<dyn CloudRepository>,
        factory: StrategyFactory,
    ) -> Self {
        let strategy =
            factory.create_strategy(config.sync.strategy, Arc::clone(&files), Arc::clone(&cloud));
        let events = Arc::new(EventBus::new());
        let progress = ProgressSink::publishing(Arc::clone(&events));

        tracing::info!(
            "Sync engine ready (strategy: {}, max concurrent: {})",
            strategy.name(),
            config.sync.max_concurrent_syncs
        );

        Self {
            inner: Arc::new(Inner {
                files,
                cloud,
                factory,
                strategy: RwLock::new(strategy),
                state: Mutex::new(QueueState {
                    queue: SyncQueue::new(config.sync.max_concurrent_syncs),
                    waiters: HashMap::new(),
                }),
                events,
                progress,
            }),
        }
    }

    /// Non-owning handle, for background tasks.
    pub fn downgrade(&self) -> WeakOrchestrator {
        WeakOrchestrator {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ===========================================
    // Observers
    // ===========================================

    /// Register an observer. Only a weak reference is kept.
    pub fn add_observer(&self, observer: Arc<dyn SyncObserver>) -> ObserverToken {
        self.inner.events.add_observer(observer)
    }

    /// Unregister an observer.
    pub fn remove_observer(&self, token: ObserverToken) {
        self.inner.events.remove_observer(token);
    }

    // ===========================================
    // Synchronization
    // ===========================================

    /// Synchronize one file.
    ///
    /// Fails with `AlreadySyncing` if the file is in flight, or if it is
    /// already queued while the concurrency bound is reached. A file the
    /// active strategy does not need to sync succeeds at once without any
    /// event. At the concurrency bound the file is queued and this call
    /// waits for its turn.
    ///
    /// The work runs on its own task, so dropping the returned future does
    /// not abandon a file that has already started.
    pub async fn synchronize(&self, file: SyncFile) -> Result<SyncResult, SyncError> {
        let strategy = self.current_strategy();
        if self.is_in_flight(&file.id) {
            return Err(SyncError::AlreadySyncing(file.id));
        }
        if !strategy.needs_sync(&file) {
            tracing::debug!("{} does not need syncing", file.name);
            return Ok(SyncResult::skipped(file));
        }

        let admission = {
            let mut state = self.state();
            let was_pending = state.queue.is_pending(&file.id);
            match state.queue.start(file.id) {
                Ok(()) => Admission::Started {
                    pending: was_pending.then(|| state.queue.pending_count()),
                },
                Err(QueueError::InFlight(id)) => return Err(SyncError::AlreadySyncing(id)),
                Err(_) if state.queue.is_pending(&file.id) => {
                    return Err(SyncError::AlreadySyncing(file.id));
                }
                Err(_) => {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.insert(file.id, tx);
                    let added = state.queue.enqueue(file.clone()).is_added();
                    Admission::Queued {
                        rx,
                        pending: added.then(|| state.queue.pending_count()),
                    }
                }
            }
        };

        match admission {
            Admission::Started { pending } => {
                if let Some(pending) = pending {
                    self.publish(&SyncEvent::QueueUpdated { pending });
                }
                let id = file.id;
                let this = self.clone();
                tokio::spawn(async move { this.execute(file, strategy).await })
                    .await
                    .map_err(|e| SyncError::Failed(format!("synchronization of {id} aborted: {e}")))
            }
            Admission::Queued { rx, pending } => {
                if let Some(pending) = pending {
                    self.publish(&SyncEvent::QueueUpdated { pending });
                }
                tracing::debug!("{} queued behind in-flight files", file.name);
                rx.await.map_err(|_| {
                    SyncError::Failed(format!("synchronization of {} was dropped", file.id))
                })
            }
        }
    }

    /// Synchronize several files and return one result per input, in input
    /// order.
    ///
    /// Files already queued or in flight are not queued again; their
    /// eventual result is collected instead.
    pub async fn synchronize_batch(
        &self,
        files: Vec<SyncFile>,
    ) -> Result<Vec<SyncResult>, SyncError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let count = files.len();
        tracing::info!("Batch sync of {} files started", count);
        self.publish(&SyncEvent::BatchStarted { count });

        let order: Vec<FileId> = files.iter().map(|file| file.id).collect();
        let (collector, done) = BatchCollector::new(order.iter().copied().collect());
        let registration = ScopedObserver::register(&self.inner.events, collector.clone());

        self.enqueue(files).await;
        done.await
            .map_err(|_| SyncError::Failed("batch collector dropped".into()))?;
        drop(registration);

        let results = collector.results_in_order(&order);
        let failed = results.iter().filter(|result| !result.is_success()).count();
        tracing::info!(
            "Batch sync finished: {} succeeded, {} failed",
            results.len() - failed,
            failed
        );
        self.publish(&SyncEvent::BatchCompleted(results.clone()));
        Ok(results)
    }

    /// Synchronize every pending file in the local store.
    pub async fn synchronize_all_pending(&self) -> Result<Vec<SyncResult>, SyncError> {
        let files = self.inner.files.pending_sync_files().await?;
        self.synchronize_batch(files).await
    }

    /// Queue files without waiting for them.
    ///
    /// Files already queued or in flight are skipped. Returns how many were
    /// added.
    pub async fn enqueue(&self, files: Vec<SyncFile>) -> usize {
        let (added, pending) = {
            let mut state = self.state();
            let added = state.queue.enqueue_all(files);
            (added, state.queue.pending_count())
        };
        if added > 0 {
            tracing::debug!("Queued {} files ({} pending)", added, pending);
            self.publish(&SyncEvent::QueueUpdated { pending });
        }
        self.drain();
        added
    }

    /// Merge the local store's pending files into the queue.
    pub async fn reconcile(&self) -> Result<usize, SyncError> {
        let files = self.inner.files.pending_sync_files().await?;
        Ok(self.enqueue(files).await)
    }

    /// Spawn the periodic reconciliation task.
    ///
    /// The task stops on its own once every orchestrator handle is dropped.
    pub fn start_reconciliation(&self, config: ReconcileConfig) -> JoinHandle<()> {
        spawn_reconcile_task(self.downgrade(), config)
    }

    /// Remove a queued file.
    ///
    /// Files in flight cannot be cancelled. Cancelling a file that is
    /// neither queued nor in flight does nothing. Callers waiting on the
    /// file receive a failed result.
    pub fn cancel_sync(&self, id: FileId) -> Result<(), SyncError> {
        let (file, pending, waiter) = {
            let mut state = self.state();
            match state.queue.cancel(&id) {
                Ok(file) => {
                    let waiter = state.waiters.remove(&id);
                    (file, state.queue.pending_count(), waiter)
                }
                Err(QueueError::InFlight(_)) => return Err(SyncError::CannotCancel(id)),
                Err(_) => return Ok(()),
            }
        };

        tracing::info!("Cancelled queued sync of {}", file.name);
        self.publish(&SyncEvent::QueueUpdated { pending });

        let result = SyncResult::failure(file, "synchronization cancelled");
        self.publish(&SyncEvent::Failed(result.clone()));
        if let Some(waiter) = waiter {
            let _ = waiter.send(result);
        }
        Ok(())
    }

    // ===========================================
    // Conflicts
    // ===========================================

    /// Settle a file in `Conflict` state. Returns the resulting local file.
    ///
    /// Fails with `AlreadySyncing` while the file is in flight. A queued
    /// sync of the file is cancelled first.
    pub async fn resolve_conflict(
        &self,
        id: FileId,
        resolution: ConflictResolution,
    ) -> Result<SyncFile, SyncError> {
        if self.is_in_flight(&id) {
            return Err(SyncError::AlreadySyncing(id));
        }
        if self.is_queued(&id) {
            self.cancel_sync(id)?;
        }
        let file = self.conflicted_file(id).await?;
        let SyncStatus::Conflict { remote_version } = file.status else {
            return Err(SyncError::NoConflict(id));
        };
        tracing::info!("Resolving conflict on {} ({})", file.name, resolution.label());

        match resolution {
            ConflictResolution::KeepLocal => {
                let saved = self.inner.files.update(supersede(file, remote_version)).await?;
                self.sync_to_completion(saved).await
            }
            ConflictResolution::KeepRemote => {
                let remote = self.remote_copy(&file).await?;
                self.take_remote(&file, &remote).await
            }
            ConflictResolution::KeepBoth => {
                let remote = self.remote_copy(&file).await?;
                self.keep_local_copy(&file).await?;
                self.take_remote(&file, &remote).await
            }
            ConflictResolution::ManualMerge(merged) => {
                let mut merged = supersede(merged, remote_version);
                merged.id = id;
                let saved = self.inner.files.update(merged).await?;
                self.sync_to_completion(saved).await
            }
        }
    }

    /// Settle a conflict with the active strategy's preference.
    ///
    /// Keeps the local copy if the strategy picks it, otherwise the remote
    /// one.
    pub async fn resolve_conflict_automatically(&self, id: FileId) -> Result<SyncFile, SyncError> {
        let file = self.conflicted_file(id).await?;
        if !file.status.is_conflict() {
            return Err(SyncError::NoConflict(id));
        }
        let remote = self.remote_copy(&file).await?;

        let winner = self.current_strategy().resolve_conflict(&file, &remote);
        let resolution = if winner == file {
            ConflictResolution::KeepLocal
        } else {
            ConflictResolution::KeepRemote
        };
        self.resolve_conflict(id, resolution).await
    }

    // ===========================================
    // Strategy
    // ===========================================

    /// The active strategy.
    pub fn current_strategy(&self) -> Arc<dyn SyncStrategy> {
        let strategy = self
            .inner
            .strategy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&strategy)
    }

    /// Replace the active strategy.
    ///
    /// Work already started finishes with the strategy it started with.
    pub fn set_strategy(&self, kind: StrategyKind) {
        let strategy = self.inner.factory.create_strategy(
            kind,
            Arc::clone(&self.inner.files),
            Arc::clone(&self.inner.cloud),
        );
        tracing::info!("Sync strategy set to {}", strategy.name());
        *self
            .inner
            .strategy
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = strategy;
    }

    // ===========================================
    // Queue Introspection
    // ===========================================

    /// Files waiting in the queue.
    pub fn pending_count(&self) -> usize {
        self.state().queue.pending_count()
    }

    /// Files being synchronized.
    pub fn in_flight_count(&self) -> usize {
        self.state().queue.in_flight_count()
    }

    /// Whether `id` is being synchronized.
    pub fn is_in_flight(&self, id: &FileId) -> bool {
        self.state().queue.is_in_flight(id)
    }

    /// Whether `id` is waiting in the queue.
    pub fn is_queued(&self, id: &FileId) -> bool {
        self.state().queue.is_pending(id)
    }

    // ===========================================
    // Internals
    // ===========================================

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: &SyncEvent) {
        self.inner.events.notify(event);
    }

    /// Run `strategy` on a file already marked in flight.
    async fn execute(&self, file: SyncFile, strategy: Arc<dyn SyncStrategy>) -> SyncResult {
        tracing::debug!("Synchronizing {} with {}", file.name, strategy.name());
        self.publish(&SyncEvent::Started(file.clone()));
        let result = strategy.synchronize(file, &self.inner.progress).await;
        self.finish(&result);
        result
    }

    /// Run a file taken from the queue.
    async fn dispatch(self, file: SyncFile) {
        let strategy = self.current_strategy();
        if strategy.needs_sync(&file) {
            self.execute(file, strategy).await;
        } else {
            tracing::debug!("{} no longer needs syncing", file.name);
            self.finish(&SyncResult::skipped(file));
        }
    }

    /// Clear in-flight state, publish the outcome, wake waiters, start more work.
    fn finish(&self, result: &SyncResult) {
        let id = result.file().id;
        let waiter = {
            let mut state = self.state();
            state.queue.finish(&id);
            state.waiters.remove(&id)
        };

        if let Some(remote) = result.conflicting_remote() {
            self.publish(&SyncEvent::ConflictDetected {
                local: result.file().clone(),
                remote: remote.clone(),
            });
        }
        if result.is_success() {
            self.publish(&SyncEvent::Completed(result.clone()));
        } else {
            self.publish(&SyncEvent::Failed(result.clone()));
        }

        if let Some(waiter) = waiter {
            let _ = waiter.send(result.clone());
        }
        self.drain();
    }

    /// Start queued files while there is capacity.
    fn drain(&self) {
        loop {
            let (file, pending) = {
                let mut state = self.state();
                match state.queue.next_ready() {
                    Some(file) => (file, state.queue.pending_count()),
                    None => return,
                }
            };
            self.publish(&SyncEvent::QueueUpdated { pending });
            tokio::spawn(self.clone().dispatch(file));
        }
    }

    async fn sync_to_completion(&self, file: SyncFile) -> Result<SyncFile, SyncError> {
        let result = self.synchronize(file).await?;
        if result.is_success() {
            Ok(result.into_file())
        } else {
            Err(SyncError::Failed(
                result
                    .error_message()
                    .unwrap_or("synchronization failed")
                    .to_string(),
            ))
        }
    }

    async fn conflicted_file(&self, id: FileId) -> Result<SyncFile, SyncError> {
        self.inner
            .files
            .get_by_id(id)
            .await?
            .ok_or(SyncError::FileNotFound(id))
    }

    async fn remote_copy(&self, file: &SyncFile) -> Result<SyncFile, SyncError> {
        self.inner.cloud.file_metadata(file).await?.ok_or_else(|| {
            SyncError::Repository(RepositoryError::NotFound(format!(
                "remote copy of {}",
                file.id
            )))
        })
    }

    /// Overwrite the local copy with the remote one and mark it synced.
    async fn take_remote(&self, file: &SyncFile, remote: &SyncFile) -> Result<SyncFile, SyncError> {
        let data = self.inner.cloud.download_file(remote).await?;
        let saved = self.inner.files.save_file_content(file.id, data).await?;
        let mut synced = saved.mark_synced(Utc::now());
        synced.version = remote.version;
        Ok(self.inner.files.update(synced).await?)
    }

    /// Store the local content as a new pending file with a conflict-copy name.
    async fn keep_local_copy(&self, file: &SyncFile) -> Result<SyncFile, SyncError> {
        let content = self.inner.files.file_content(file.id).await?;

        let mut copy = file.clone();
        copy.id = FileId::new();
        copy.name = conflict_copy_name(&file.name, Utc::now());
        copy.status = SyncStatus::Pending;
        copy.last_synced_at = None;

        self.inner.files.create(copy.clone()).await?;
        let copy = self.inner.files.save_file_content(copy.id, content).await?;
        tracing::info!("Kept local version of {} as {}", file.name, copy.name);
        Ok(copy)
    }
}

/// Reset a file so its next upload supersedes remote `remote_version`.
fn supersede(mut file: SyncFile, remote_version: u64) -> SyncFile {
    file.version = file.version.max(remote_version.saturating_add(1));
    file.status = SyncStatus::Pending;
    file
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("SyncOrchestrator")
            .field("strategy", &self.current_strategy().name())
            .field("pending", &state.queue.pending_count())
            .field("in_flight", &state.queue.in_flight_count())
            .finish()
    }
}

/// Scoped observer collecting one result per expected file.
struct BatchCollector {
    expected: HashSet<FileId>,
    state: Mutex<CollectorState>,
}

struct CollectorState {
    results: HashMap<FileId, SyncResult>,
    done: Option<oneshot::Sender<()>>,
}

impl BatchCollector {
    fn new(expected: HashSet<FileId>) -> (Arc<Self>, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let collector = Arc::new(Self {
            expected,
            state: Mutex::new(CollectorState {
                results: HashMap::new(),
                done: Some(tx),
            }),
        });
        (collector, rx)
    }

    fn lock(&self) -> MutexGuard<'_, CollectorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn results_in_order(&self, order: &[FileId]) -> Vec<SyncResult> {
        let state = self.lock();
        order
            .iter()
            .filter_map(|id| state.results.get(id).cloned())
            .collect()
    }
}

impl SyncObserver for BatchCollector {
    fn on_event(&self, event: &SyncEvent) {
        let Some(result) = event.result() else {
            return;
        };
        let id = result.file().id;
        if !self.expected.contains(&id) {
            return;
        }

        let mut state = self.lock();
        state.results.entry(id).or_insert_with(|| result.clone());
        if state.results.len() == self.expected.len() {
            if let Some(done) = state.done.take() {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryCloudRepository, MemoryFileRepository};
    use crate::events::ChannelObserver;

    fn engine(max: usize, kind: StrategyKind) -> (MemoryFileRepository, MemoryCloudRepository, SyncOrchestrator) {
        let files = MemoryFileRepository::new();
        let cloud = MemoryCloudRepository::new();
        let mut config = EngineConfig::default();
        config.sync.max_concurrent_syncs = max;
        config.sync.strategy = kind;
        let orchestrator =
            SyncOrchestrator::new(&config, Arc::new(files.clone()), Arc::new(cloud.clone()));
        (files, cloud, orchestrator)
    }

    fn drain_events(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn synchronize_publishes_lifecycle() {
        let (files, cloud, orchestrator) = engine(3, StrategyKind::Full);
        let (observer, mut rx) = ChannelObserver::new();
        orchestrator.add_observer(observer.clone());
        let file = files.add_file("a.txt", "/", "text/plain", b"abc".to_vec());

        let result = orchestrator.synchronize(file.clone()).await.unwrap();

        assert!(result.is_success());
        assert!(cloud.remote(&file.id).is_some());
        assert_eq!(orchestrator.in_flight_count(), 0);
        let names: Vec<&str> = drain_events(&mut rx).iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["started", "progress", "progress", "progress", "completed"]
        );
    }

    #[tokio::test]
    async fn file_not_needing_sync_is_skipped_silently() {
        let (files, cloud, orchestrator) = engine(3, StrategyKind::Delta);
        let (observer, mut rx) = ChannelObserver::new();
        orchestrator.add_observer(observer.clone());
        let file = files
            .add_file("a.txt", "/", "text/plain", vec![1])
            .mark_synced(Utc::now());

        let result = orchestrator.synchronize(file).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.bytes_transferred(), 0);
        assert!(cloud.uploads().is_empty());
        assert!(drain_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn cancel_unknown_file_is_a_no_op() {
        let (_files, _cloud, orchestrator) = engine(1, StrategyKind::Full);
        orchestrator.cancel_sync(FileId::new()).unwrap();
    }

    #[tokio::test]
    async fn set_strategy_swaps_instance() {
        let (_files, _cloud, orchestrator) = engine(1, StrategyKind::Delta);
        assert_eq!(orchestrator.current_strategy().kind(), StrategyKind::Delta);

        orchestrator.set_strategy(StrategyKind::Scheduled);
        assert_eq!(orchestrator.current_strategy().kind(), StrategyKind::Scheduled);
        assert_eq!(orchestrator.current_strategy().name(), "Scheduled Sync");
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let (_files, _cloud, orchestrator) = engine(1, StrategyKind::Full);
        let (observer, mut rx) = ChannelObserver::new();
        orchestrator.add_observer(observer.clone());

        assert!(orchestrator.synchronize_batch(Vec::new()).await.unwrap().is_empty());
        assert!(drain_events(&mut rx).is_empty());
    }

    #[test]
    fn supersede_moves_past_remote_version() {
        let file = SyncFile::new("a", "/", 1, "a/b", "h", "me").mark_conflict(7);
        let next = supersede(file, 7);
        assert_eq!(next.version, 8);
        assert!(next.status.is_pending());

        let mut ahead = SyncFile::new("a", "/", 1, "a/b", "h", "me");
        ahead.version = 20;
        assert_eq!(supersede(ahead, 7).version, 20);
    }

    #[test]
    fn resolution_labels() {
        assert_eq!(ConflictResolution::KeepBoth.label(), "keep_both");
        let merged = SyncFile::new("a", "/", 1, "a/b", "h", "me");
        assert_eq!(ConflictResolution::ManualMerge(merged).label(), "manual_merge");
    }

    #[tokio::test]
    async fn weak_handle_dies_with_orchestrator() {
        let (_files, _cloud, orchestrator) = engine(1, StrategyKind::Full);
        let weak = orchestrator.downgrade();
        assert!(weak.upgrade().is_some());
        drop(orchestrator);
        assert!(weak.upgrade().is_none());
    }
}
