//! File metadata and sync status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::FileId;

/// Synchronization state of a single file.
///
/// A file enters `Syncing` only when it is started for active
/// synchronization, and leaves it for exactly one of `Synced`, `Error`,
/// or `Conflict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncStatus {
    /// Waiting to be synchronized. Initial state for new or changed files.
    Pending,
    /// Currently being synchronized.
    Syncing {
        /// Fraction complete, 0.0 to 1.0.
        progress: f64,
    },
    /// Local and remote copies agree.
    Synced,
    /// Local and remote diverged; needs explicit resolution.
    Conflict {
        /// Version number of the remote copy.
        remote_version: u64,
    },
    /// The last synchronization attempt failed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl SyncStatus {
    /// Check if the file is waiting to be synchronized.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Check if the file is currently being synchronized.
    pub fn is_syncing(&self) -> bool {
        matches!(self, Self::Syncing { .. })
    }

    /// Check if the file is synchronized.
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }

    /// Check if the file is in conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if the last attempt failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Short lowercase label, matching the serialized `type` tag.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing { .. } => "syncing",
            Self::Synced => "synced",
            Self::Conflict { .. } => "conflict",
            Self::Error { .. } => "error",
        }
    }
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Synchronization-relevant metadata for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncFile {
    /// Unique identifier.
    pub id: FileId,
    /// File name, including extension.
    pub name: String,
    /// Directory path the file lives in.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub modified_at: DateTime<Utc>,
    /// Last successful synchronization, if any.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Hex-encoded content hash.
    pub content_hash: String,
    /// Monotonically increasing version.
    pub version: u64,
    /// Owner identifier.
    pub owner_id: String,
    /// Shared with other users.
    pub is_shared: bool,
    /// Starred by the owner.
    pub is_starred: bool,
    /// Soft-deleted.
    pub is_deleted: bool,
    /// Stored encrypted.
    pub is_encrypted: bool,
    /// Free-form tags.
    pub tags: BTreeSet<String>,
    /// Free-form key/value metadata.
    pub metadata: BTreeMap<String, String>,
    /// Current synchronization state.
    pub status: SyncStatus,
}

impl SyncFile {
    /// Create a new file record: fresh id, timestamps set to now,
    /// version 1, status `Pending`, all flags cleared.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        content_hash: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: FileId::new(),
            name: name.into(),
            path: path.into(),
            size,
            mime_type: mime_type.into(),
            created_at: now,
            modified_at: now,
            last_synced_at: None,
            content_hash: content_hash.into(),
            version: 1,
            owner_id: owner_id.into(),
            is_shared: false,
            is_starred: false,
            is_deleted: false,
            is_encrypted: false,
            tags: BTreeSet::new(),
            metadata: BTreeMap::new(),
            status: SyncStatus::Pending,
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: SyncStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the modification time.
    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = modified_at;
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// File extension without the dot, empty if there is none.
    pub fn extension(&self) -> &str {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
    }

    /// Copy of this file in `Syncing` state.
    pub fn mark_syncing(&self, progress: f64) -> Self {
        let mut file = self.clone();
        file.status = SyncStatus::Syncing {
            progress: progress.clamp(0.0, 1.0),
        };
        file
    }

    /// Copy of this file marked synchronized at `now`.
    pub fn mark_synced(&self, now: DateTime<Utc>) -> Self {
        let mut file = self.clone();
        file.last_synced_at = Some(now);
        file.status = SyncStatus::Synced;
        file
    }

    /// Copy of this file marked as failed.
    pub fn mark_error(&self, message: impl Into<String>) -> Self {
        let mut file = self.clone();
        file.status = SyncStatus::Error {
            message: message.into(),
        };
        file
    }

    /// Copy of this file marked as conflicting with `remote_version`.
    pub fn mark_conflict(&self, remote_version: u64) -> Self {
        let mut file = self.clone();
        file.status = SyncStatus::Conflict { remote_version };
        file
    }

    /// Next version of this file after a content change.
    pub fn new_version(&self, content_hash: impl Into<String>, size: u64, now: DateTime<Utc>) -> Self {
        let mut file = self.clone();
        file.version = file.version.saturating_add(1);
        file.modified_at = now;
        file.content_hash = content_hash.into();
        file.size = size;
        file.status = SyncStatus::Pending;
        file
    }
}
