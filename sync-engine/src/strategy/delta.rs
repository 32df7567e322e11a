use std::sync::Arc;

use async_trait::async_trait;
use sync_core::{prefer_richer_metadata, DeltaCodec};
use sync_types::{StrategyKind, SyncFile, SyncResult};

use super::{Payload, Repositories, SyncStrategy, TransferError};
use crate::events::ProgressSink;
use crate::repository::{CloudRepository, FileRepository};

/// Uploads a delta packet against the remote copy when that is smaller
/// than the full content.
///
/// A missing or unreadable remote copy falls back to a full upload. On
/// conflict, identical content keeps the copy with more metadata; otherwise
/// the most recently modified copy wins.
#[derive(Clone)]
pub struct DeltaStrategy {
    repos: Repositories,
    codec: DeltaCodec,
}

impl DeltaStrategy {
    /// Create a delta strategy over the given stores.
    pub fn new(
        files: Arc<dyn FileRepository>,
        cloud: Arc<dyn CloudRepository>,
        codec: DeltaCodec,
    ) -> Self {
        Self {
            repos: Repositories::new(files, cloud),
            codec,
        }
    }

    async fn build_payload(&self, file: &SyncFile, local: Vec<u8>) -> Result<Payload, TransferError> {
        let remote = match self.repos.cloud.file_content(file).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::debug!("Remote content unavailable for {}: {}", file.name, e);
                None
            }
        };

        let Some(remote) = remote else {
            tracing::debug!("No remote copy of {}, uploading full content", file.name);
            return Ok(Payload::Full(local));
        };

        let packet = self.codec.generate(&remote, &local)?;
        if packet.len() < local.len() {
            tracing::debug!(
                "Delta for {}: {} bytes instead of {}",
                file.name,
                packet.len(),
                local.len()
            );
            Ok(Payload::Delta(packet))
        } else {
            Ok(Payload::Full(local))
        }
    }
}

#[async_trait]
impl SyncStrategy for DeltaStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Delta
    }

    fn name(&self) -> &'static str {
        "Delta Sync"
    }

    fn description(&self) -> &'static str {
        "Synchronizes only the changes between versions, saving bandwidth"
    }

    async fn synchronize(&self, file: SyncFile, progress: &ProgressSink) -> SyncResult {
        self.repos
            .transfer(file, progress, |file, local| async move {
                self.build_payload(&file, local).await
            })
            .await
    }

    fn needs_sync(&self, file: &SyncFile) -> bool {
        !file.status.is_synced()
    }

    fn resolve_conflict(&self, local: &SyncFile, remote: &SyncFile) -> SyncFile {
        prefer_richer_metadata(local, remote).clone()
    }
}
