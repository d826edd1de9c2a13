//! Document metadata record.

use crate::types::{DocumentId, EntryType};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Identity and placement of one document or folder
///
/// Serialized to JSON with the client's field names and content-addressed
/// like any other file of a manifest. Replace it whole, never patch a field
/// in place on a hashed document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFile {
    #[serde(rename = "visibleName", default)]
    pub document_name: String,
    #[serde(rename = "type", default)]
    pub collection_type: EntryType,
    #[serde(default)]
    pub parent: DocumentId,
    #[serde(rename = "lastModified", default)]
    pub last_modified: String,
    #[serde(rename = "lastOpened", default)]
    pub last_opened: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(rename = "metadatamodified", default)]
    pub metadata_modified: bool,
}

impl MetadataFile {
    /// Metadata for a freshly uploaded entry: version 1, modified now
    pub fn new(name: impl Into<String>, parent: impl Into<String>, kind: EntryType) -> Self {
        Self {
            document_name: name.into(),
            collection_type: kind,
            parent: parent.into(),
            last_modified: now_millis_string(),
            last_opened: "0".to_string(),
            version: 1,
            ..Default::default()
        }
    }

    /// Copy with a new name, bumped version and fresh modification time
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            document_name: name.into(),
            version: self.version + 1,
            last_modified: now_millis_string(),
            metadata_modified: true,
            ..self.clone()
        }
    }

    /// Copy under a new parent, bumped version and fresh modification time
    pub fn moved(&self, parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            version: self.version + 1,
            last_modified: now_millis_string(),
            metadata_modified: true,
            ..self.clone()
        }
    }

    /// Canonical JSON bytes (field order is the struct order)
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn is_collection(&self) -> bool {
        self.collection_type.is_collection()
    }
}

/// Milliseconds since the epoch, as clients encode `lastModified`
pub fn now_millis_string() -> String {
    Utc::now().timestamp_millis().to_string()
}
