//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sync_core::content_hash;
use sync_engine::{
    ChannelObserver, EngineConfig, MemoryCloudRepository, MemoryFileRepository, StrategyKind,
    SyncEvent, SyncFile, SyncOrchestrator,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// Orchestrator over in-memory stores, with every event captured.
pub struct Harness {
    pub files: MemoryFileRepository,
    pub cloud: MemoryCloudRepository,
    pub orchestrator: SyncOrchestrator,
    pub events: UnboundedReceiver<SyncEvent>,
    // Observers are held weakly by the bus.
    _observer: Arc<ChannelObserver>,
}

impl Harness {
    pub fn new(max_concurrent_syncs: usize, strategy: StrategyKind) -> Self {
        Self::with_latency(max_concurrent_syncs, strategy, Duration::ZERO)
    }

    /// Every cloud call takes `latency`.
    pub fn with_latency(
        max_concurrent_syncs: usize,
        strategy: StrategyKind,
        latency: Duration,
    ) -> Self {
        let files = MemoryFileRepository::new();
        let cloud = MemoryCloudRepository::new().with_latency(latency);

        let mut config = EngineConfig::default();
        config.sync.max_concurrent_syncs = max_concurrent_syncs;
        config.sync.strategy = strategy;

        let orchestrator =
            SyncOrchestrator::new(&config, Arc::new(files.clone()), Arc::new(cloud.clone()));
        let (observer, events) = ChannelObserver::new();
        orchestrator.add_observer(observer.clone());

        Self {
            files,
            cloud,
            orchestrator,
            events,
            _observer: observer,
        }
    }

    /// Add `count` pending text files named `file-<n>.txt`.
    pub fn add_files(&self, count: usize) -> Vec<SyncFile> {
        (0..count)
            .map(|n| {
                self.files.add_file(
                    &format!("file-{n}.txt"),
                    "/docs",
                    "text/plain",
                    format!("content of file {n}").into_bytes(),
                )
            })
            .collect()
    }

    /// Events received so far.
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Put a newer remote version of `local` with different content.
    pub fn put_newer_remote(&self, local: &SyncFile, version: u64, content: &[u8]) -> SyncFile {
        let mut remote = local.clone();
        remote.version = version;
        remote.content_hash = content_hash(content);
        remote.size = content.len() as u64;
        remote.modified_at = local.modified_at + chrono::Duration::minutes(5);
        self.cloud.put_remote(remote.clone(), content.to_vec());
        remote
    }

    /// Yield until `done` holds, at most 1000 times.
    pub async fn settle(&self, mut done: impl FnMut(&SyncOrchestrator) -> bool) {
        for _ in 0..1000 {
            if done(&self.orchestrator) {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }
}

/// Event names in order.
pub fn names(events: &[SyncEvent]) -> Vec<&'static str> {
    events.iter().map(|event| event.name()).collect()
}
