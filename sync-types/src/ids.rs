//! Identity types for cloudsync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A unique identifier for a synchronized file.
///
/// UUID v4 format (16 bytes). Displayed in hyphenated lowercase form,
/// which is also the form repositories use as a lookup key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(uuid::Uuid);

impl FileId {
    /// Create a new random FileId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Create a FileId from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        uuid::Uuid::from_slice(bytes).ok().map(Self)
    }

    /// Get the raw bytes of this FileId.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for FileId {
    fn from(value: uuid::Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_is_uuid_v4() {
        let id = FileId::new();
        assert_eq!(id.as_bytes().len(), 16);
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn file_id_roundtrip_bytes() {
        let original = FileId::new();
        let restored = FileId::from_bytes(original.as_bytes()).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn file_id_parses_display_form() {
        let original = FileId::new();
        let parsed: FileId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn file_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<FileId>().is_err());
        assert!(FileId::from_bytes(&[0u8; 4]).is_none());
    }

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(FileId::new(), FileId::new());
    }
}
