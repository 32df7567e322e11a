//! Outcome of a single synchronize call.

use std::time::Duration;

use crate::SyncFile;

/// Immutable outcome of one synchronize invocation.
///
/// Bytes and elapsed time are unsigned, so they can never be negative.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    file: SyncFile,
    success: bool,
    error_message: Option<String>,
    bytes_transferred: u64,
    time_taken: Duration,
    remote: Option<Box<SyncFile>>,
}

impl SyncResult {
    /// A successful synchronization.
    pub fn success(file: SyncFile, bytes_transferred: u64, time_taken: Duration) -> Self {
        Self {
            file,
            success: true,
            error_message: None,
            bytes_transferred,
            time_taken,
            remote: None,
        }
    }

    /// A zero-cost success for a file that needed no work.
    pub fn skipped(file: SyncFile) -> Self {
        Self::success(file, 0, Duration::ZERO)
    }

    /// A failed synchronization.
    pub fn failure(file: SyncFile, error: impl Into<String>) -> Self {
        Self {
            file,
            success: false,
            error_message: Some(error.into()),
            bytes_transferred: 0,
            time_taken: Duration::ZERO,
            remote: None,
        }
    }

    /// A failure caused by a detected conflict with `remote`.
    pub fn conflict(file: SyncFile, remote: SyncFile) -> Self {
        let message = format!(
            "conflict: remote version {} is newer than local version {}",
            remote.version, file.version
        );
        Self {
            remote: Some(Box::new(remote)),
            ..Self::failure(file, message)
        }
    }

    /// The file as it stood when the call finished.
    pub fn file(&self) -> &SyncFile {
        &self.file
    }

    /// Consume the result, returning the file.
    pub fn into_file(self) -> SyncFile {
        self.file
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Error message for failed calls.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Bytes sent to the remote store.
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Wall-clock time spent.
    pub fn time_taken(&self) -> Duration {
        self.time_taken
    }

    /// Remote snapshot when the failure is a conflict.
    pub fn conflicting_remote(&self) -> Option<&SyncFile> {
        self.remote.as_deref()
    }
}
