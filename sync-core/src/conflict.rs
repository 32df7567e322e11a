//! Conflict rules.
//!
//! Detection compares a local file with the remote copy's metadata.
//! Resolution picks the copy a strategy prefers. Naming produces the file
//! name for the copy that keeps local content when both sides are kept.

use std::path::Path;

use chrono::{DateTime, Utc};
use sync_types::SyncFile;

/// Timestamp format used in conflict copy names.
pub const CONFLICT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Whether `remote` conflicts with `local`.
///
/// The remote copy must be a newer version with different content.
pub fn detect_conflict(local: &SyncFile, remote: &SyncFile) -> bool {
    remote.version > local.version && remote.content_hash != local.content_hash
}

/// The more recently modified copy. Ties go to `remote`.
pub fn last_write_wins<'a>(local: &'a SyncFile, remote: &'a SyncFile) -> &'a SyncFile {
    if local.modified_at > remote.modified_at {
        local
    } else {
        remote
    }
}

/// Prefer the copy with more metadata when content is identical.
///
/// With equal hashes the copy carrying more metadata entries wins (ties go
/// to `remote`); otherwise falls back to [`last_write_wins`].
pub fn prefer_richer_metadata<'a>(local: &'a SyncFile, remote: &'a SyncFile) -> &'a SyncFile {
    if local.content_hash == remote.content_hash {
        if local.metadata.len() > remote.metadata.len() {
            local
        } else {
            remote
        }
    } else {
        last_write_wins(local, remote)
    }
}

/// Name for a conflict copy of `name` created at `at`.
///
/// `notes.txt` becomes `notes (conflict 2024-03-01-142530).txt`; a name
/// without an extension gets the suffix appended. Timestamps are UTC.
pub fn conflict_copy_name(name: &str, at: DateTime<Utc>) -> String {
    let stamp = at.format(CONFLICT_TIMESTAMP_FORMAT);
    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str());
    let ext = path.extension().and_then(|e| e.to_str());

    match (stem, ext) {
        (Some(stem), Some(ext)) => format!("{stem} (conflict {stamp}).{ext}"),
        _ => format!("{name} (conflict {stamp})"),
    }
}
