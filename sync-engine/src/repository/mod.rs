//! Repository abstraction for the sync engine.
//!
//! Strategies and the orchestrator reach storage only through these
//! traits: a local store holding file metadata and content, and a remote
//! store accepting uploads. Both are injected as trait objects.
//!
//! # Example
//!
//! ```ignore
//! let files = MemoryFileRepository::new();
//! let cloud = MemoryCloudRepository::new();
//! let file = files.add_file("notes.txt", "/docs", "text/plain", b"hello".to_vec());
//! cloud.upload_file(&file, b"hello".to_vec(), false).await?;
//! ```

mod memory;

pub use memory::{MemoryCloudRepository, MemoryFileRepository, UploadRecord};

use async_trait::async_trait;
use sync_types::{FileId, RepositoryError, SyncFile};

/// Local file store.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Look up a file. `None` if it does not exist.
    async fn get_by_id(&self, id: FileId) -> Result<Option<SyncFile>, RepositoryError>;

    /// Replace an existing file's metadata.
    async fn update(&self, file: SyncFile) -> Result<SyncFile, RepositoryError>;

    /// Store a new file record.
    async fn create(&self, file: SyncFile) -> Result<SyncFile, RepositoryError>;

    /// Remove a file and its content.
    async fn delete(&self, id: FileId) -> Result<(), RepositoryError>;

    /// Read a file's content.
    async fn file_content(&self, id: FileId) -> Result<Vec<u8>, RepositoryError>;

    /// Replace a file's content.
    ///
    /// Recomputes the content hash, size and modification time, and resets
    /// the status to `Pending`. Returns the updated file.
    async fn save_file_content(&self, id: FileId, data: Vec<u8>)
        -> Result<SyncFile, RepositoryError>;

    /// Files waiting to be synchronized: not deleted and `Pending`.
    async fn pending_sync_files(&self) -> Result<Vec<SyncFile>, RepositoryError>;
}

/// Remote file store.
#[async_trait]
pub trait CloudRepository: Send + Sync {
    /// Upload content for `file`. With `is_delta`, `data` is a delta packet
    /// against the content currently stored remotely.
    async fn upload_file(
        &self,
        file: &SyncFile,
        data: Vec<u8>,
        is_delta: bool,
    ) -> Result<(), RepositoryError>;

    /// Download the remote content of `file`.
    async fn download_file(&self, file: &SyncFile) -> Result<Vec<u8>, RepositoryError>;

    /// Remote metadata for `file`. `None` if it has never been uploaded.
    async fn file_metadata(&self, file: &SyncFile) -> Result<Option<SyncFile>, RepositoryError>;

    /// Remote content for `file`. `None` if it has never been uploaded.
    async fn file_content(&self, file: &SyncFile) -> Result<Option<Vec<u8>>, RepositoryError>;

    /// Remove the remote copy of `file`.
    async fn delete_file(&self, file: &SyncFile) -> Result<(), RepositoryError>;

    /// Remote files stored under `path`.
    async fn list_files(&self, path: &str) -> Result<Vec<SyncFile>, RepositoryError>;
}
