//! In-memory repositories.
//!
//! Used by tests and the CLI demo. Both types are cheap to clone; clones
//! share state, so a test can keep one handle for inspection and give
//! another to the engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sync_core::{content_hash, DeltaCodec};
use sync_types::{FileId, RepositoryError, SyncFile, SyncStatus};

use super::{CloudRepository, FileRepository};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

// ===========================================
// Local store
// ===========================================

/// In-memory local file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileRepository {
    inner: Arc<Mutex<FileStoreInner>>,
}

#[derive(Debug, Default)]
struct FileStoreInner {
    files: Vec<StoredFile>,
    updates: Vec<SyncFile>,
    latency: Duration,
    fail_next_update: Option<String>,
    fail_next_read: Option<String>,
    fail_next_save: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredFile {
    meta: SyncFile,
    content: Vec<u8>,
}

impl FileStoreInner {
    fn find(&self, id: &FileId) -> Option<&StoredFile> {
        self.files.iter().find(|stored| stored.meta.id == *id)
    }

    fn find_mut(&mut self, id: &FileId) -> Option<&mut StoredFile> {
        self.files.iter_mut().find(|stored| stored.meta.id == *id)
    }
}

fn not_found(id: &FileId) -> RepositoryError {
    RepositoryError::NotFound(format!("file {id}"))
}

impl MemoryFileRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        lock(&self.inner).latency = latency;
        self
    }

    /// Store `content` as a new `Pending` file and return its record.
    pub fn add_file(
        &self,
        name: &str,
        path: &str,
        mime_type: &str,
        content: Vec<u8>,
    ) -> SyncFile {
        let file = SyncFile::new(
            name,
            path,
            content.len() as u64,
            mime_type,
            content_hash(&content),
            "local",
        );
        self.insert(file.clone(), content);
        file
    }

    /// Store a record as-is, replacing any file with the same id.
    pub fn insert(&self, file: SyncFile, content: Vec<u8>) {
        let mut inner = lock(&self.inner);
        inner.files.retain(|stored| stored.meta.id != file.id);
        inner.files.push(StoredFile {
            meta: file,
            content,
        });
    }

    /// Current record for `id`.
    pub fn get(&self, id: &FileId) -> Option<SyncFile> {
        lock(&self.inner).find(id).map(|stored| stored.meta.clone())
    }

    /// Current content for `id`.
    pub fn content(&self, id: &FileId) -> Option<Vec<u8>> {
        lock(&self.inner).find(id).map(|stored| stored.content.clone())
    }

    /// All records, in insertion order.
    pub fn files(&self) -> Vec<SyncFile> {
        lock(&self.inner)
            .files
            .iter()
            .map(|stored| stored.meta.clone())
            .collect()
    }

    /// Every record passed to `update`, oldest first.
    pub fn updates(&self) -> Vec<SyncFile> {
        lock(&self.inner).updates.clone()
    }

    /// Cause the next update() to fail with the given error.
    pub fn fail_next_update(&self, error: &str) {
        lock(&self.inner).fail_next_update = Some(error.to_string());
    }

    /// Cause the next file_content() or pending_sync_files() to fail with
    /// the given error.
    pub fn fail_next_read(&self, error: &str) {
        lock(&self.inner).fail_next_read = Some(error.to_string());
    }

    /// Cause the next save_file_content() to fail with the given error.
    pub fn fail_next_save(&self, error: &str) {
        lock(&self.inner).fail_next_save = Some(error.to_string());
    }

    fn latency(&self) -> Duration {
        lock(&self.inner).latency
    }
}

#[async_trait]
impl FileRepository for MemoryFileRepository {
    async fn get_by_id(&self, id: FileId) -> Result<Option<SyncFile>, RepositoryError> {
        simulate_latency(self.latency()).await;
        Ok(self.get(&id))
    }

    async fn update(&self, file: SyncFile) -> Result<SyncFile, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_update.take() {
            return Err(RepositoryError::Storage(error));
        }

        let stored = inner.find_mut(&file.id).ok_or_else(|| not_found(&file.id))?;
        stored.meta = file.clone();
        inner.updates.push(file.clone());
        Ok(file)
    }

    async fn create(&self, file: SyncFile) -> Result<SyncFile, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if inner.find(&file.id).is_some() {
            return Err(RepositoryError::Storage(format!(
                "file {} already exists",
                file.id
            )));
        }
        inner.files.push(StoredFile {
            meta: file.clone(),
            content: Vec::new(),
        });
        Ok(file)
    }

    async fn delete(&self, id: FileId) -> Result<(), RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        let before = inner.files.len();
        inner.files.retain(|stored| stored.meta.id != id);
        if inner.files.len() == before {
            return Err(not_found(&id));
        }
        Ok(())
    }

    async fn file_content(&self, id: FileId) -> Result<Vec<u8>, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_read.take() {
            return Err(RepositoryError::Storage(error));
        }
        inner
            .find(&id)
            .map(|stored| stored.content.clone())
            .ok_or_else(|| not_found(&id))
    }

    async fn save_file_content(
        &self,
        id: FileId,
        data: Vec<u8>,
    ) -> Result<SyncFile, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_save.take() {
            return Err(RepositoryError::Storage(error));
        }

        let stored = inner.find_mut(&id).ok_or_else(|| not_found(&id))?;
        stored.meta.content_hash = content_hash(&data);
        stored.meta.size = data.len() as u64;
        stored.meta.modified_at = Utc::now();
        stored.meta.status = SyncStatus::Pending;
        stored.content = data;
        Ok(stored.meta.clone())
    }

    async fn pending_sync_files(&self) -> Result<Vec<SyncFile>, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_read.take() {
            return Err(RepositoryError::Storage(error));
        }
        Ok(inner
            .files
            .iter()
            .filter(|stored| !stored.meta.is_deleted && stored.meta.status.is_pending())
            .map(|stored| stored.meta.clone())
            .collect())
    }
}

// ===========================================
// Remote store
// ===========================================

/// One call to [`CloudRepository::upload_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    /// File uploaded.
    pub file_id: FileId,
    /// Bytes sent.
    pub bytes: usize,
    /// Whether the payload was a delta packet.
    pub is_delta: bool,
}

/// In-memory remote store.
///
/// Delta uploads are applied to the stored content with [`DeltaCodec`];
/// a packet that does not apply fails the upload.
#[derive(Debug, Clone, Default)]
pub struct MemoryCloudRepository {
    inner: Arc<Mutex<CloudStoreInner>>,
}

#[derive(Debug, Default)]
struct CloudStoreInner {
    files: HashMap<FileId, StoredFile>,
    uploads: Vec<UploadRecord>,
    latency: Duration,
    active_uploads: usize,
    peak_uploads: usize,
    fail_next_upload: Option<String>,
    fail_next_download: Option<String>,
    fail_next_metadata: Option<String>,
}

impl MemoryCloudRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        lock(&self.inner).latency = latency;
        self
    }

    /// Store a remote copy as-is, e.g. a newer version from another device.
    pub fn put_remote(&self, file: SyncFile, content: Vec<u8>) {
        lock(&self.inner).files.insert(
            file.id,
            StoredFile {
                meta: file,
                content,
            },
        );
    }

    /// Remote record for `id`.
    pub fn remote(&self, id: &FileId) -> Option<SyncFile> {
        lock(&self.inner).files.get(id).map(|stored| stored.meta.clone())
    }

    /// Remote content for `id`.
    pub fn remote_content(&self, id: &FileId) -> Option<Vec<u8>> {
        lock(&self.inner)
            .files
            .get(id)
            .map(|stored| stored.content.clone())
    }

    /// Every upload, oldest first.
    pub fn uploads(&self) -> Vec<UploadRecord> {
        lock(&self.inner).uploads.clone()
    }

    /// Highest number of uploads observed running at once.
    pub fn peak_concurrent_uploads(&self) -> usize {
        lock(&self.inner).peak_uploads
    }

    /// Cause the next upload_file() to fail with the given error.
    pub fn fail_next_upload(&self, error: &str) {
        lock(&self.inner).fail_next_upload = Some(error.to_string());
    }

    /// Cause the next download_file() or file_content() to fail with the given error.
    pub fn fail_next_download(&self, error: &str) {
        lock(&self.inner).fail_next_download = Some(error.to_string());
    }

    /// Cause the next file_metadata() to fail with the given error.
    pub fn fail_next_metadata(&self, error: &str) {
        lock(&self.inner).fail_next_metadata = Some(error.to_string());
    }

    fn latency(&self) -> Duration {
        lock(&self.inner).latency
    }
}

#[async_trait]
impl CloudRepository for MemoryCloudRepository {
    async fn upload_file(
        &self,
        file: &SyncFile,
        data: Vec<u8>,
        is_delta: bool,
    ) -> Result<(), RepositoryError> {
        let latency = {
            let mut inner = lock(&self.inner);
            inner.active_uploads += 1;
            inner.peak_uploads = inner.peak_uploads.max(inner.active_uploads);
            inner.latency
        };
        simulate_latency(latency).await;

        let mut inner = lock(&self.inner);
        inner.active_uploads -= 1;

        if let Some(error) = inner.fail_next_upload.take() {
            return Err(RepositoryError::Upload(error));
        }

        let bytes = data.len();
        let content = if is_delta {
            let base = inner
                .files
                .get(&file.id)
                .map(|stored| stored.content.as_slice())
                .ok_or_else(|| {
                    RepositoryError::Upload(format!("no remote base for delta of {}", file.id))
                })?;
            DeltaCodec::new()
                .apply(base, &data)
                .map_err(|e| RepositoryError::Upload(e.to_string()))?
        } else {
            data
        };

        let mut meta = file.clone();
        meta.content_hash = content_hash(&content);
        meta.size = content.len() as u64;
        meta.last_synced_at = Some(Utc::now());
        meta.status = SyncStatus::Synced;

        tracing::debug!(
            "Stored {} ({} bytes, delta: {})",
            file.name,
            content.len(),
            is_delta
        );
        inner.files.insert(file.id, StoredFile { meta, content });
        inner.uploads.push(UploadRecord {
            file_id: file.id,
            bytes,
            is_delta,
        });
        Ok(())
    }

    async fn download_file(&self, file: &SyncFile) -> Result<Vec<u8>, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_download.take() {
            return Err(RepositoryError::Download(error));
        }
        inner
            .files
            .get(&file.id)
            .map(|stored| stored.content.clone())
            .ok_or_else(|| not_found(&file.id))
    }

    async fn file_metadata(&self, file: &SyncFile) -> Result<Option<SyncFile>, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_metadata.take() {
            return Err(RepositoryError::Download(error));
        }
        Ok(inner.files.get(&file.id).map(|stored| stored.meta.clone()))
    }

    async fn file_content(&self, file: &SyncFile) -> Result<Option<Vec<u8>>, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut inner = lock(&self.inner);

        if let Some(error) = inner.fail_next_download.take() {
            return Err(RepositoryError::Download(error));
        }
        Ok(inner.files.get(&file.id).map(|stored| stored.content.clone()))
    }

    async fn delete_file(&self, file: &SyncFile) -> Result<(), RepositoryError> {
        simulate_latency(self.latency()).await;
        lock(&self.inner)
            .files
            .remove(&file.id)
            .map(|_| ())
            .ok_or_else(|| not_found(&file.id))
    }

    async fn list_files(&self, path: &str) -> Result<Vec<SyncFile>, RepositoryError> {
        simulate_latency(self.latency()).await;
        let mut files: Vec<SyncFile> = lock(&self.inner)
            .files
            .values()
            .filter(|stored| stored.meta.path == path)
            .map(|stored| stored.meta.clone())
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===========================================
    // MemoryFileRepository Tests
    // ===========================================

    #[tokio::test]
    async fn add_file_computes_hash_and_size() {
        let repo = MemoryFileRepository::new();
        let file = repo.add_file("a.txt", "/docs", "text/plain", b"hello".to_vec());

        assert_eq!(file.size, 5);
        assert_eq!(file.content_hash, content_hash(b"hello"));
        assert_eq!(repo.file_content(file.id).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn update_replaces_metadata_and_records_history() {
        let repo = MemoryFileRepository::new();
        let file = repo.add_file("a.txt", "/", "text/plain", vec![1]);

        repo.update(file.mark_syncing(0.0)).await.unwrap();
        repo.update(file.mark_synced(Utc::now())).await.unwrap();

        assert!(repo.get(&file.id).unwrap().status.is_synced());
        let history: Vec<&str> = repo.updates().iter().map(|f| f.status.label()).collect();
        assert_eq!(history, vec!["syncing", "synced"]);
    }

    #[tokio::test]
    async fn update_missing_file_is_not_found() {
        let repo = MemoryFileRepository::new();
        let stray = SyncFile::new("x", "/", 0, "a/b", "h", "me");
        assert!(matches!(
            repo.update(stray).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_content_resets_to_pending() {
        let repo = MemoryFileRepository::new();
        let file = repo.add_file("a.txt", "/", "text/plain", b"old".to_vec());
        repo.update(file.mark_synced(Utc::now())).await.unwrap();

        let saved = repo
            .save_file_content(file.id, b"new content".to_vec())
            .await
            .unwrap();

        assert_eq!(saved.size, 11);
        assert_eq!(saved.content_hash, content_hash(b"new content"));
        assert!(saved.status.is_pending());
        assert!(saved.modified_at >= file.modified_at);
        assert_eq!(repo.content(&file.id).unwrap(), b"new content");
    }

    #[tokio::test]
    async fn pending_files_skip_deleted_and_synced() {
        let repo = MemoryFileRepository::new();
        let pending = repo.add_file("p", "/", "a/b", vec![1]);
        let synced = repo.add_file("s", "/", "a/b", vec![2]);
        let deleted = repo.add_file("d", "/", "a/b", vec![3]);

        repo.update(synced.mark_synced(Utc::now())).await.unwrap();
        let mut gone = deleted.clone();
        gone.is_deleted = true;
        repo.update(gone).await.unwrap();

        let ids: Vec<FileId> = repo
            .pending_sync_files()
            .await
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![pending.id]);
    }

    #[tokio::test]
    async fn create_and_delete() {
        let repo = MemoryFileRepository::new();
        let file = SyncFile::new("n", "/", 0, "a/b", "h", "me");

        repo.create(file.clone()).await.unwrap();
        assert!(repo.create(file.clone()).await.is_err());
        assert!(repo.get_by_id(file.id).await.unwrap().is_some());

        repo.delete(file.id).await.unwrap();
        assert!(repo.get_by_id(file.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(file.id).await,
            Err(RepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn forced_failures_fire_once() {
        let repo = MemoryFileRepository::new();
        let file = repo.add_file("a", "/", "a/b", vec![1]);

        repo.fail_next_read("disk gone");
        assert!(matches!(
            repo.file_content(file.id).await,
            Err(RepositoryError::Storage(_))
        ));
        repo.file_content(file.id).await.unwrap();

        repo.fail_next_update("locked");
        assert!(repo.update(file.clone()).await.is_err());
        repo.update(file.clone()).await.unwrap();

        repo.fail_next_save("full");
        assert!(repo.save_file_content(file.id, vec![]).await.is_err());
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let repo1 = MemoryFileRepository::new();
        let repo2 = repo1.clone();
        let file = repo1.add_file("a", "/", "a/b", vec![1]);
        assert!(repo2.get(&file.id).is_some());
    }

    // ===========================================
    // MemoryCloudRepository Tests
    // ===========================================

    fn local(content: &[u8]) -> SyncFile {
        SyncFile::new("doc.bin", "/", content.len() as u64, "a/b", content_hash(content), "me")
    }

    #[tokio::test]
    async fn full_upload_stores_content() {
        let cloud = MemoryCloudRepository::new();
        let file = local(b"payload");

        assert!(cloud.file_metadata(&file).await.unwrap().is_none());
        cloud.upload_file(&file, b"payload".to_vec(), false).await.unwrap();

        let remote = cloud.file_metadata(&file).await.unwrap().unwrap();
        assert_eq!(remote.content_hash, content_hash(b"payload"));
        assert!(remote.status.is_synced());
        assert_eq!(cloud.download_file(&file).await.unwrap(), b"payload");
        assert_eq!(
            cloud.uploads(),
            vec![UploadRecord {
                file_id: file.id,
                bytes: 7,
                is_delta: false
            }]
        );
    }

    #[tokio::test]
    async fn delta_upload_applies_packet() {
        let cloud = MemoryCloudRepository::new();
        let old = vec![b'a'; 200];
        let new = b"0123456789".to_vec();
        let file = local(&new);
        cloud.put_remote(file.clone(), old.clone());

        let packet = DeltaCodec::new().generate(&old, &new).unwrap();
        cloud.upload_file(&file, packet, true).await.unwrap();

        assert_eq!(cloud.remote_content(&file.id).unwrap(), new);
        assert!(cloud.uploads()[0].is_delta);
    }

    #[tokio::test]
    async fn delta_upload_without_base_fails() {
        let cloud = MemoryCloudRepository::new();
        let file = local(b"x");
        let packet = DeltaCodec::new().generate(b"base", b"x").unwrap();
        assert!(matches!(
            cloud.upload_file(&file, packet, true).await,
            Err(RepositoryError::Upload(_))
        ));
    }

    #[tokio::test]
    async fn delta_upload_against_wrong_base_fails() {
        let cloud = MemoryCloudRepository::new();
        let file = local(b"x");
        cloud.put_remote(file.clone(), b"something else".to_vec());
        let packet = DeltaCodec::new().generate(b"base", b"x").unwrap();

        let err = cloud.upload_file(&file, packet, true).await.unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[tokio::test]
    async fn forced_cloud_failures() {
        let cloud = MemoryCloudRepository::new();
        let file = local(b"x");

        cloud.fail_next_upload("503");
        assert!(matches!(
            cloud.upload_file(&file, b"x".to_vec(), false).await,
            Err(RepositoryError::Upload(_))
        ));
        assert!(cloud.uploads().is_empty());

        cloud.upload_file(&file, b"x".to_vec(), false).await.unwrap();
        cloud.fail_next_download("reset");
        assert!(matches!(
            cloud.download_file(&file).await,
            Err(RepositoryError::Download(_))
        ));
        cloud.fail_next_metadata("reset");
        assert!(cloud.file_metadata(&file).await.is_err());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let cloud = MemoryCloudRepository::new();
        let b = SyncFile::new("b.txt", "/docs", 1, "text/plain", "h", "me");
        let a = SyncFile::new("a.txt", "/docs", 1, "text/plain", "h", "me");
        let other = SyncFile::new("c.txt", "/other", 1, "text/plain", "h", "me");
        for file in [&b, &a, &other] {
            cloud.upload_file(file, vec![1], false).await.unwrap();
        }

        let names: Vec<String> = cloud
            .list_files("/docs")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        cloud.delete_file(&a).await.unwrap();
        assert!(cloud.remote(&a.id).is_none());
        assert!(cloud.delete_file(&a).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn tracks_peak_concurrent_uploads() {
        let cloud = MemoryCloudRepository::new().with_latency(Duration::from_millis(50));
        let (a, b, c) = (local(&[1]), local(&[2]), local(&[3]));

        let (ra, rb, rc) = tokio::join!(
            cloud.upload_file(&a, vec![1], false),
            cloud.upload_file(&b, vec![2], false),
            cloud.upload_file(&c, vec![3], false),
        );
        ra.unwrap();
        rb.unwrap();
        rc.unwrap();

        assert_eq!(cloud.peak_concurrent_uploads(), 3);
        assert_eq!(cloud.uploads().len(), 3);
    }
}
