//! Strategy construction from a [`StrategyKind`] tag.

use std::sync::Arc;

use sync_core::{DeltaCodec, FileFilter};
use sync_types::StrategyKind;

use crate::repository::{CloudRepository, FileRepository};
use crate::scheduler::{DelayScheduler, TokioScheduler};
use crate::strategy::{
    DeltaStrategy, FullStrategy, ScheduledStrategy, SelectiveStrategy, SyncStrategy,
};

/// Builds strategies, injecting the shared codec, delay scheduler and
/// selective filter.
///
/// - `Full` and `Delta` map to their strategies directly
/// - `Scheduled` wraps a full strategy
/// - `Selective` wraps a delta strategy with the configured filter
///
/// Every call builds a new instance.
#[derive(Clone)]
pub struct StrategyFactory {
    codec: DeltaCodec,
    scheduler: Arc<dyn DelayScheduler>,
    filter: FileFilter,
}

impl StrategyFactory {
    /// Factory with the default codec, the tokio scheduler and an
    /// accept-all filter.
    pub fn new() -> Self {
        Self {
            codec: DeltaCodec::new(),
            scheduler: Arc::new(TokioScheduler),
            filter: FileFilter::accept_all(),
        }
    }

    /// Use `codec` for delta strategies.
    pub fn with_codec(mut self, codec: DeltaCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Use `scheduler` for scheduled strategies.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn DelayScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Use `filter` for selective strategies.
    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Build the strategy for `kind`.
    pub fn create_strategy(
        &self,
        kind: StrategyKind,
        files: Arc<dyn FileRepository>,
        cloud: Arc<dyn CloudRepository>,
    ) -> Arc<dyn SyncStrategy> {
        match kind {
            StrategyKind::Full => Arc::new(FullStrategy::new(files, cloud)),
            StrategyKind::Delta => Arc::new(DeltaStrategy::new(files, cloud, self.codec)),
            StrategyKind::Scheduled => {
                let base = Arc::new(FullStrategy::new(files, cloud));
                Arc::new(ScheduledStrategy::new(base, Arc::clone(&self.scheduler)))
            }
            StrategyKind::Selective => {
                let base = Arc::new(DeltaStrategy::new(files, cloud, self.codec));
                Arc::new(SelectiveStrategy::with_filter(base, self.filter.clone()))
            }
        }
    }
}

impl Default for StrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}
