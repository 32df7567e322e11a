use std::sync::Arc;

use async_trait::async_trait;
use sync_core::FileFilter;
use sync_types::{StrategyKind, SyncFile, SyncResult};

use super::SyncStrategy;
use crate::events::ProgressSink;

/// Selection predicate for [`SelectiveStrategy`].
pub type FilePredicate = Arc<dyn Fn(&SyncFile) -> bool + Send + Sync>;

/// Handles only files accepted by a predicate, delegating to a base
/// strategy.
///
/// Rejected files succeed immediately with nothing transferred.
pub struct SelectiveStrategy {
    base: Arc<dyn SyncStrategy>,
    predicate: FilePredicate,
}

impl SelectiveStrategy {
    /// Wrap `base` with an arbitrary predicate.
    pub fn new(base: Arc<dyn SyncStrategy>, predicate: FilePredicate) -> Self {
        Self { base, predicate }
    }

    /// Wrap `base` with a [`FileFilter`].
    pub fn with_filter(base: Arc<dyn SyncStrategy>, filter: FileFilter) -> Self {
        Self::new(base, Arc::new(move |file: &SyncFile| filter.accepts(file)))
    }

    /// Whether the predicate accepts `file`.
    pub fn accepts(&self, file: &SyncFile) -> bool {
        (self.predicate)(file)
    }
}

#[async_trait]
impl SyncStrategy for SelectiveStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Selective
    }

    fn name(&self) -> &'static str {
        "Selective Sync"
    }

    fn description(&self) -> &'static str {
        "Synchronizes only files matching specific criteria"
    }

    async fn synchronize(&self, file: SyncFile, progress: &ProgressSink) -> SyncResult {
        if !self.accepts(&file) {
            tracing::debug!("{} excluded by selective filter", file.name);
            return SyncResult::skipped(file);
        }
        self.base.synchronize(file, progress).await
    }

    fn needs_sync(&self, file: &SyncFile) -> bool {
        self.accepts(file) && self.base.needs_sync(file)
    }

    fn resolve_conflict(&self, local: &SyncFile, remote: &SyncFile) -> SyncFile {
        self.base.resolve_conflict(local, remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::memory_repos;
    use crate::strategy::DeltaStrategy;
    use chrono::Utc;
    use std::time::Duration;
    use sync_core::DeltaCodec;

    fn images_only() -> (
        crate::repository::MemoryFileRepository,
        crate::repository::MemoryCloudRepository,
        SelectiveStrategy,
    ) {
        let (files, cloud, repos) = memory_repos();
        let base: Arc<dyn SyncStrategy> =
            Arc::new(DeltaStrategy::new(repos.files, repos.cloud, DeltaCodec::new()));
        let filter = FileFilter::accept_all().with_mime_prefix("image/");
        (files, cloud, SelectiveStrategy::with_filter(base, filter))
    }

    #[tokio::test]
    async fn rejected_file_is_a_free_success() {
        let (files, cloud, strategy) = images_only();
        let file = files.add_file("notes.txt", "/", "text/plain", vec![1; 10]);

        let result = strategy.synchronize(file.clone(), &ProgressSink::noop()).await;

        assert!(result.is_success());
        assert_eq!(result.bytes_transferred(), 0);
        assert_eq!(result.time_taken(), Duration::ZERO);
        assert!(cloud.uploads().is_empty());
        assert!(files.get(&file.id).unwrap().status.is_pending());
    }

    #[tokio::test]
    async fn accepted_file_goes_through_base() {
        let (files, cloud, strategy) = images_only();
        let file = files.add_file("cat.png", "/", "image/png", vec![9; 32]);

        let result = strategy.synchronize(file.clone(), &ProgressSink::noop()).await;

        assert!(result.is_success());
        assert_eq!(cloud.remote_content(&file.id).unwrap(), vec![9; 32]);
    }

    #[test]
    fn needs_sync_requires_both() {
        let (_files, _cloud, strategy) = images_only();
        let image = SyncFile::new("a.png", "/", 1, "image/png", "h", "me");
        let text = SyncFile::new("a.txt", "/", 1, "text/plain", "h", "me");

        assert!(strategy.needs_sync(&image));
        assert!(!strategy.needs_sync(&text));
        assert!(!strategy.needs_sync(&image.mark_synced(Utc::now())));
    }

    #[test]
    fn closure_predicate() {
        let (_files, _cloud, repos) = memory_repos();
        let base: Arc<dyn SyncStrategy> =
            Arc::new(DeltaStrategy::new(repos.files, repos.cloud, DeltaCodec::new()));
        let strategy = SelectiveStrategy::new(base, Arc::new(|file: &SyncFile| file.is_starred));

        let mut file = SyncFile::new("a", "/", 1, "a/b", "h", "me");
        assert!(!strategy.accepts(&file));
        file.is_starred = true;
        assert!(strategy.accepts(&file));
        assert_eq!(strategy.name(), "Selective Sync");
    }
}
