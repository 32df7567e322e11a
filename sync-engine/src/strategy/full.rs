use std::sync::Arc;

use async_trait::async_trait;
use sync_core::last_write_wins;
use sync_types::{StrategyKind, SyncFile, SyncResult};

use super::{Payload, Repositories, SyncStrategy, TransferError};
use crate::events::ProgressSink;
use crate::repository::{CloudRepository, FileRepository};

/// Uploads the entire content of every file that is not yet synced.
///
/// Conflicts go to the most recently modified copy.
#[derive(Clone)]
pub struct FullStrategy {
    repos: Repositories,
}

impl FullStrategy {
    /// Create a full strategy over the given stores.
    pub fn new(files: Arc<dyn FileRepository>, cloud: Arc<dyn CloudRepository>) -> Self {
        Self {
            repos: Repositories::new(files, cloud),
        }
    }
}

#[async_trait]
impl SyncStrategy for FullStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Full
    }

    fn name(&self) -> &'static str {
        "Full Sync"
    }

    fn description(&self) -> &'static str {
        "Synchronizes the entire file content, regardless of changes"
    }

    async fn synchronize(&self, file: SyncFile, progress: &ProgressSink) -> SyncResult {
        self.repos
            .transfer(file, progress, |_, local| async move {
                Ok::<_, TransferError>(Payload::Full(local))
            })
            .await
    }

    fn needs_sync(&self, file: &SyncFile) -> bool {
        !file.status.is_synced()
    }

    fn resolve_conflict(&self, local: &SyncFile, remote: &SyncFile) -> SyncFile {
        last_write_wins(local, remote).clone()
    }
}
