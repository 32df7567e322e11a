//! Error types for cloudsync.

use thiserror::Error;

use crate::FileId;

/// Errors surfaced by the orchestrator's public operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The file is already being synchronized.
    #[error("file {0} is already being synchronized")]
    AlreadySyncing(FileId),

    /// The file is in flight and cannot be cancelled.
    #[error("cannot cancel ongoing synchronization of {0}")]
    CannotCancel(FileId),

    /// No file with this id exists in the local store.
    #[error("file not found: {0}")]
    FileNotFound(FileId),

    /// The file is not in conflict.
    #[error("no conflict to resolve for {0}")]
    NoConflict(FileId),

    /// Unrecognized strategy tag.
    #[error("unknown sync strategy: {0}")]
    UnknownStrategy(String),

    /// Synchronization failed.
    #[error("synchronization failed: {0}")]
    Failed(String),

    /// A repository call failed outside a strategy.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors reported by local and remote repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Requested item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upload to the remote store failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Download from the remote store failed.
    #[error("download failed: {0}")]
    Download(String),

    /// Local storage read or write failed.
    #[error("storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::Repository(RepositoryError::Upload("timeout".into()));
        assert_eq!(err.to_string(), "repository error: upload failed: timeout");
    }

    #[test]
    fn repository_error_converts() {
        fn load() -> Result<(), SyncError> {
            Err(RepositoryError::NotFound("x".into()))?
        }
        assert!(matches!(load(), Err(SyncError::Repository(_))));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
        assert_send_sync::<RepositoryError>();
    }
}
