//! Selection predicate for selective synchronization.

use serde::Deserialize;
use sync_types::SyncFile;

/// Decides which files selective sync handles.
///
/// The default accepts every file that is not deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileFilter {
    /// MIME type prefixes to accept (`"image/"`, `"text/plain"`). Empty accepts all.
    pub include_mime_prefixes: Vec<String>,
    /// Files carrying any of these tags are rejected.
    pub exclude_tags: Vec<String>,
    /// Largest accepted size in bytes. Zero means unlimited.
    pub max_size_bytes: u64,
    /// Accept soft-deleted files.
    pub include_deleted: bool,
}

impl FileFilter {
    /// Filter accepting every non-deleted file.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Accept only MIME types starting with `prefix`. May be called repeatedly.
    pub fn with_mime_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.include_mime_prefixes.push(prefix.into());
        self
    }

    /// Reject files tagged `tag`.
    pub fn excluding_tag(mut self, tag: impl Into<String>) -> Self {
        self.exclude_tags.push(tag.into());
        self
    }

    /// Reject files larger than `bytes`.
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size_bytes = bytes;
        self
    }

    /// Whether `file` passes the filter.
    pub fn accepts(&self, file: &SyncFile) -> bool {
        if file.is_deleted && !self.include_deleted {
            return false;
        }
        if self.max_size_bytes > 0 && file.size > self.max_size_bytes {
            return false;
        }
        if self.exclude_tags.iter().any(|tag| file.tags.contains(tag)) {
            return false;
        }
        self.include_mime_prefixes.is_empty()
            || self
                .include_mime_prefixes
                .iter()
                .any(|prefix| file.mime_type.starts_with(prefix.as_str()))
    }
}
