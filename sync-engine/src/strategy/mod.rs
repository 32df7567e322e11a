//! Synchronization strategies.
//!
//! A strategy decides whether a file needs syncing, moves it to the remote
//! store, and picks a winner when local and remote copies conflict.
//!
//! - [`FullStrategy`] - uploads the whole content every time
//! - [`DeltaStrategy`] - uploads a delta packet against the remote copy when smaller
//! - [`ScheduledStrategy`] - waits a size- and age-based delay, then delegates
//! - [`SelectiveStrategy`] - only handles files accepted by a predicate
//!
//! `synchronize` never returns an error: repository failures become a
//! failed [`SyncResult`] and a persisted `Error` status.

mod delta;
mod full;
mod scheduled;
mod selective;

pub use delta::DeltaStrategy;
pub use full::FullStrategy;
pub use scheduled::ScheduledStrategy;
pub use selective::{FilePredicate, SelectiveStrategy};

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sync_core::{detect_conflict, DeltaFormatError};
use sync_types::{RepositoryError, StrategyKind, SyncFile, SyncResult};
use thiserror::Error;

use crate::events::ProgressSink;
use crate::repository::{CloudRepository, FileRepository};

/// A way of synchronizing files.
#[async_trait]
pub trait SyncStrategy: Send + Sync {
    /// Selection tag for this strategy.
    fn kind(&self) -> StrategyKind;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn description(&self) -> &'static str;

    /// Synchronize one file.
    async fn synchronize(&self, file: SyncFile, progress: &ProgressSink) -> SyncResult;

    /// Whether `file` needs synchronizing.
    fn needs_sync(&self, file: &SyncFile) -> bool;

    /// The copy that should win a conflict.
    fn resolve_conflict(&self, local: &SyncFile, remote: &SyncFile) -> SyncFile;
}

/// Local and remote stores shared by the transfer strategies.
#[derive(Clone)]
pub(crate) struct Repositories {
    pub(crate) files: Arc<dyn FileRepository>,
    pub(crate) cloud: Arc<dyn CloudRepository>,
}

/// Content prepared for upload.
pub(crate) enum Payload {
    Full(Vec<u8>),
    Delta(Vec<u8>),
}

#[derive(Debug, Error)]
pub(crate) enum TransferError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("delta generation failed: {0}")]
    Delta(#[from] DeltaFormatError),
}

const ALREADY_SYNCING: &str = "file is already being synced";

impl Repositories {
    pub(crate) fn new(files: Arc<dyn FileRepository>, cloud: Arc<dyn CloudRepository>) -> Self {
        Self { files, cloud }
    }

    /// Shared upload pipeline.
    ///
    /// Marks the file `Syncing`, checks the remote copy for a conflict,
    /// reads local content, lets `prepare` shape the payload, uploads it and
    /// marks the file `Synced`.
    pub(crate) async fn transfer<F, Fut>(
        &self,
        file: SyncFile,
        progress: &ProgressSink,
        prepare: F,
    ) -> SyncResult
    where
        F: FnOnce(SyncFile, Vec<u8>) -> Fut + Send,
        Fut: Future<Output = Result<Payload, TransferError>> + Send,
    {
        if file.status.is_syncing() {
            return SyncResult::failure(file, ALREADY_SYNCING);
        }

        let start = Instant::now();
        match self.run_transfer(&file, progress, prepare, start).await {
            Ok(result) => result,
            Err(e) => self.fail(&file, e).await,
        }
    }

    async fn run_transfer<F, Fut>(
        &self,
        file: &SyncFile,
        progress: &ProgressSink,
        prepare: F,
        start: Instant,
    ) -> Result<SyncResult, TransferError>
    where
        F: FnOnce(SyncFile, Vec<u8>) -> Fut + Send,
        Fut: Future<Output = Result<Payload, TransferError>> + Send,
    {
        let syncing = self.files.update(file.mark_syncing(0.0)).await?;
        progress.report(&syncing, 0.0);

        if !file.status.is_conflict() {
            if let Some(result) = self.check_conflict(&syncing).await {
                return Ok(result);
            }
        }

        let local = self.files.file_content(syncing.id).await?;
        let payload = prepare(syncing.clone(), local).await?;
        progress.report(&syncing, 0.5);

        let (data, is_delta) = match payload {
            Payload::Full(data) => (data, false),
            Payload::Delta(data) => (data, true),
        };
        let bytes = data.len() as u64;
        self.cloud.upload_file(&syncing, data, is_delta).await?;
        progress.report(&syncing, 1.0);

        let synced = self.files.update(syncing.mark_synced(Utc::now())).await?;
        tracing::info!(
            "Synchronized {} ({} bytes, delta: {})",
            synced.name,
            bytes,
            is_delta
        );
        Ok(SyncResult::success(synced, bytes, start.elapsed()))
    }

    /// Compare against remote metadata; mark and persist a conflict.
    async fn check_conflict(&self, file: &SyncFile) -> Option<SyncResult> {
        let remote = match self.cloud.file_metadata(file).await {
            Ok(Some(remote)) => remote,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    "Remote metadata unavailable for {}, skipping conflict check: {}",
                    file.name,
                    e
                );
                return None;
            }
        };

        if !detect_conflict(file, &remote) {
            return None;
        }

        tracing::info!(
            "Conflict on {}: remote version {} is newer than local version {}",
            file.name,
            remote.version,
            file.version
        );
        let conflicted = file.mark_conflict(remote.version);
        let conflicted = self.persist_or_keep(conflicted).await;
        Some(SyncResult::conflict(conflicted, remote))
    }

    /// Record the error on the file and build the failed result.
    async fn fail(&self, file: &SyncFile, error: TransferError) -> SyncResult {
        let message = error.to_string();
        tracing::warn!("Synchronization of {} failed: {}", file.name, message);
        let errored = self.persist_or_keep(file.mark_error(message.clone())).await;
        SyncResult::failure(errored, message)
    }

    async fn persist_or_keep(&self, file: SyncFile) -> SyncFile {
        match self.files.update(file.clone()).await {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!("Failed to persist status of {}: {}", file.name, e);
                file
            }
        }
    }
}
