//! Lifecycle events and the observer registry.
//!
//! The orchestrator publishes a [`SyncEvent`] for every step of a file's
//! synchronization. Observers register with an [`EventBus`] and receive
//! events synchronously, in registration order, on the publishing task.
//!
//! The bus holds weak references only: dropping the last `Arc` to an
//! observer unsubscribes it. [`EventBus::remove_observer`] unsubscribes
//! explicitly, and [`ScopedObserver`] does so on drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use sync_types::{FileId, SyncFile, SyncResult};
use tokio::sync::mpsc;

/// Lifecycle event published by the orchestrator.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A file started synchronizing.
    Started(SyncFile),
    /// A strategy reported progress (0.0 to 1.0).
    Progress {
        /// File being synchronized.
        file: SyncFile,
        /// Fraction complete.
        progress: f64,
    },
    /// A file finished successfully.
    Completed(SyncResult),
    /// A file failed, was cancelled, or hit a conflict.
    Failed(SyncResult),
    /// The remote copy is newer than the local one.
    ConflictDetected {
        /// Local file, now in `Conflict` state.
        local: SyncFile,
        /// Remote metadata.
        remote: SyncFile,
    },
    /// A batch was accepted.
    BatchStarted {
        /// Number of files in the batch.
        count: usize,
    },
    /// Every file in a batch has a result.
    BatchCompleted(Vec<SyncResult>),
    /// The pending queue changed.
    QueueUpdated {
        /// Pending files after the change.
        pending: usize,
    },
}

impl SyncEvent {
    /// The file this event concerns, for per-file events.
    pub fn file_id(&self) -> Option<FileId> {
        match self {
            Self::Started(file) | Self::Progress { file, .. } => Some(file.id),
            Self::Completed(result) | Self::Failed(result) => Some(result.file().id),
            Self::ConflictDetected { local, .. } => Some(local.id),
            Self::BatchStarted { .. } | Self::BatchCompleted(_) | Self::QueueUpdated { .. } => None,
        }
    }

    /// The final result carried by `Completed` and `Failed`.
    pub fn result(&self) -> Option<&SyncResult> {
        match self {
            Self::Completed(result) | Self::Failed(result) => Some(result),
            _ => None,
        }
    }

    /// Short lowercase name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started(_) => "started",
            Self::Progress { .. } => "progress",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::BatchStarted { .. } => "batch_started",
            Self::BatchCompleted(_) => "batch_completed",
            Self::QueueUpdated { .. } => "queue_updated",
        }
    }
}

/// Receives lifecycle events.
///
/// Called on the publishing task; implementations should return quickly.
pub trait SyncObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &SyncEvent);
}

/// Handle returned by [`EventBus::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

struct Registration {
    token: ObserverToken,
    observer: Weak<dyn SyncObserver>,
}

/// Registry of weakly held observers.
#[derive(Default)]
pub struct EventBus {
    next_token: AtomicU64,
    observers: Mutex<Vec<Registration>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// Only a weak reference is kept; the caller owns the observer.
    pub fn add_observer(&self, observer: Arc<dyn SyncObserver>) -> ObserverToken {
        let token = ObserverToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.registry().push(Registration {
            token,
            observer: Arc::downgrade(&observer),
        });
        token
    }

    /// Unregister an observer. Unknown tokens are ignored.
    pub fn remove_observer(&self, token: ObserverToken) {
        self.registry().retain(|entry| entry.token != token);
    }

    /// Deliver `event` to every live observer in registration order.
    ///
    /// Dead entries are pruned. The registry lock is released before
    /// delivery, so observers may add or remove observers.
    pub fn notify(&self, event: &SyncEvent) {
        let live: Vec<Arc<dyn SyncObserver>> = {
            let mut registry = self.registry();
            registry.retain(|entry| entry.observer.strong_count() > 0);
            registry
                .iter()
                .filter_map(|entry| entry.observer.upgrade())
                .collect()
        };

        for observer in live {
            observer.on_event(event);
        }
    }

    /// Number of live observers.
    pub fn observer_count(&self) -> usize {
        self.registry()
            .iter()
            .filter(|entry| entry.observer.strong_count() > 0)
            .count()
    }

    fn registry(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Keeps an observer registered until dropped.
pub struct ScopedObserver {
    bus: Arc<EventBus>,
    token: ObserverToken,
}

impl ScopedObserver {
    /// Register `observer` on `bus` for the lifetime of the guard.
    pub fn register(bus: &Arc<EventBus>, observer: Arc<dyn SyncObserver>) -> Self {
        let token = bus.add_observer(observer);
        Self {
            bus: Arc::clone(bus),
            token,
        }
    }

    /// Token of the scoped registration.
    pub fn token(&self) -> ObserverToken {
        self.token
    }
}

impl Drop for ScopedObserver {
    fn drop(&mut self) {
        self.bus.remove_observer(self.token);
    }
}

/// Observer forwarding events into a tokio channel.
///
/// Keep the returned `Arc` alive for as long as events should flow.
#[derive(Debug)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl SyncObserver for ChannelObserver {
    fn on_event(&self, event: &SyncEvent) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(event.clone());
    }
}

type ProgressFn = dyn Fn(&SyncFile, f64) + Send + Sync;

/// Progress callback handed to strategies.
#[derive(Clone)]
pub struct ProgressSink {
    report: Option<Arc<ProgressFn>>,
}

impl ProgressSink {
    /// Sink that discards reports.
    pub fn noop() -> Self {
        Self { report: None }
    }

    /// Sink calling `f` for every report.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SyncFile, f64) + Send + Sync + 'static,
    {
        Self {
            report: Some(Arc::new(f)),
        }
    }

    /// Sink publishing [`SyncEvent::Progress`] on `bus`.
    pub fn publishing(bus: Arc<EventBus>) -> Self {
        Self::new(move |file, progress| {
            bus.notify(&SyncEvent::Progress {
                file: file.clone(),
                progress,
            })
        })
    }

    /// Report `progress` for `file`, clamped to 0.0..=1.0.
    pub fn report(&self, file: &SyncFile, progress: f64) {
        if let Some(report) = &self.report {
            report(file, progress.clamp(0.0, 1.0));
        }
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("active", &self.report.is_some())
            .finish()
    }
}
