use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sync_core::sync_delay;
use sync_types::{StrategyKind, SyncFile, SyncResult};

use super::SyncStrategy;
use crate::events::ProgressSink;
use crate::scheduler::DelayScheduler;

/// Waits before delegating to a base strategy.
///
/// The wait grows with file size and time since modification; see
/// [`sync_delay`]. `needs_sync` and `resolve_conflict` delegate unchanged.
pub struct ScheduledStrategy {
    base: Arc<dyn SyncStrategy>,
    scheduler: Arc<dyn DelayScheduler>,
}

impl ScheduledStrategy {
    /// Wrap `base`, waiting through `scheduler`.
    pub fn new(base: Arc<dyn SyncStrategy>, scheduler: Arc<dyn DelayScheduler>) -> Self {
        Self { base, scheduler }
    }

    /// The wrapped strategy.
    pub fn base(&self) -> &Arc<dyn SyncStrategy> {
        &self.base
    }
}

#[async_trait]
impl SyncStrategy for ScheduledStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Scheduled
    }

    fn name(&self) -> &'static str {
        "Scheduled Sync"
    }

    fn description(&self) -> &'static str {
        "Synchronizes files on a scheduled basis rather than immediately"
    }

    async fn synchronize(&self, file: SyncFile, progress: &ProgressSink) -> SyncResult {
        let delay = sync_delay(&file, Utc::now());
        tracing::debug!("Scheduling {} in {:?}", file.name, delay);
        self.scheduler.delay(delay).await;
        self.base.synchronize(file, progress).await
    }

    fn needs_sync(&self, file: &SyncFile) -> bool {
        self.base.needs_sync(file)
    }

    fn resolve_conflict(&self, local: &SyncFile, remote: &SyncFile) -> SyncFile {
        self.base.resolve_conflict(local, remote)
    }
}
