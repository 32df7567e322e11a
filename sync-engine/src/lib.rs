//! # sync-engine
//!
//! Async synchronization engine for cloudsync.
//!
//! Moves files between a local store and a cloud store using pluggable
//! strategies, under a concurrency bound, and reports progress to
//! observers.
//!
//! ## Features
//!
//! - **Strategies**: full, delta, scheduled and selective synchronization
//! - **Bounded Concurrency**: at most `max_concurrent_syncs` files in flight
//! - **Conflict Handling**: version-based detection, four resolutions
//! - **Events**: weakly held observers, scoped registration, channels
//! - **Reconciliation**: periodic re-queue of pending files
//! - **Storage Abstraction**: repository traits with in-memory implementations
//!
//! ## Example
//!
//! ```ignore
//! use sync_engine::{EngineConfig, SyncOrchestrator, MemoryCloudRepository, MemoryFileRepository};
//!
//! let config = EngineConfig::default();
//! let orchestrator = SyncOrchestrator::new(
//!     &config,
//!     Arc::new(MemoryFileRepository::new()),
//!     Arc::new(MemoryCloudRepository::new()),
//! );
//!
//! let results = orchestrator.synchronize_all_pending().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod events;
pub mod factory;
pub mod orchestrator;
pub mod reconcile;
pub mod repository;
pub mod scheduler;
pub mod strategy;

pub use config::{ConfigError, EngineConfig, ReconcileConfig, SyncSettings};
pub use events::{
    ChannelObserver, EventBus, ObserverToken, ProgressSink, ScopedObserver, SyncEvent,
    SyncObserver,
};
pub use factory::StrategyFactory;
pub use orchestrator::{ConflictResolution, SyncOrchestrator, WeakOrchestrator};
pub use reconcile::spawn_reconcile_task;
pub use repository::{
    CloudRepository, FileRepository, MemoryCloudRepository, MemoryFileRepository, UploadRecord,
};
pub use scheduler::{DelayScheduler, InstantScheduler, TokioScheduler};
pub use strategy::{
    DeltaStrategy, FilePredicate, FullStrategy, ScheduledStrategy, SelectiveStrategy,
    SyncStrategy,
};

// Re-export the shared vocabulary so callers need only this crate.
pub use sync_types::{
    FileId, RepositoryError, StrategyKind, SyncError, SyncFile, SyncResult, SyncStatus,
};
