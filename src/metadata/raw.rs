//! Legacy per-document metadata record (sync v1).

use crate::metadata::MetadataFile;
use crate::types::{DocumentId, EntryType};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Metadata record stored as `<id>.metadata` next to a v1 archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMetadata {
    #[serde(rename = "ID")]
    pub id: DocumentId,
    #[serde(rename = "Version", default)]
    pub version: i64,
    #[serde(rename = "ModifiedClient", default)]
    pub modified_client: String,
    #[serde(rename = "Type", default)]
    pub doc_type: EntryType,
    #[serde(rename = "VissibleName", default)]
    pub visible_name: String,
    #[serde(rename = "CurrentPage", default)]
    pub current_page: i64,
    #[serde(rename = "Bookmarked", default)]
    pub bookmarked: bool,
    #[serde(rename = "Parent", default)]
    pub parent: DocumentId,
}

impl RawMetadata {
    /// Record for a newly created entry: version 1, modified now
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
        doc_type: EntryType,
    ) -> Self {
        Self {
            id: id.into(),
            version: 1,
            modified_client: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            doc_type,
            visible_name: name.into(),
            current_page: 0,
            bookmarked: false,
            parent: parent.into(),
        }
    }

    /// Parse `ModifiedClient`; `None` when a client wrote something unparsable
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.modified_client)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Project onto the metadata shape shared by both backends
    pub fn to_metadata_file(&self) -> MetadataFile {
        MetadataFile {
            document_name: self.visible_name.clone(),
            collection_type: self.doc_type,
            parent: self.parent.clone(),
            last_modified: self
                .modified_at()
                .map(|t| t.timestamp_millis().to_string())
                .unwrap_or_default(),
            version: self.version,
            ..Default::default()
        }
    }
}
