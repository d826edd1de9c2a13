//! Core type definitions shared across the sync core

use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowercase hex SHA-256 digest used as a content address
pub type Hash = String;

/// Document identifier (UUID string minted on first upload)
pub type DocumentId = String;

/// User identity supplied by the surrounding auth layer
pub type UserId = String;

pub const METADATA_FILE_EXT: &str = ".metadata";
pub const CONTENT_FILE_EXT: &str = ".content";
pub const PAGE_FILE_EXT: &str = ".pagedata";
pub const ZIP_FILE_EXT: &str = ".zip";
pub const PDF_FILE_EXT: &str = ".pdf";
pub const EPUB_FILE_EXT: &str = ".epub";

/// Parent id used by clients for trashed documents
pub const TRASH_PARENT: &str = "trash";

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EntryType {
    #[default]
    #[serde(rename = "DocumentType")]
    Document,
    #[serde(rename = "CollectionType")]
    Collection,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Document => "DocumentType",
            EntryType::Collection => "CollectionType",
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, EntryType::Collection)
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync protocol spoken by a client; selects the storage backend
///
/// Deserializes from `"1.5"`, `"v2"` or a bare number, so environment
/// overrides parsed as floats still resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "VersionRepr")]
pub enum SyncVersion {
    #[serde(rename = "1.0")]
    Sync10,
    #[default]
    #[serde(rename = "1.5")]
    Sync15,
}

impl std::str::FromStr for SyncVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" | "10" | "v1" => Ok(SyncVersion::Sync10),
            "1.5" | "15" | "v2" => Ok(SyncVersion::Sync15),
            other => Err(format!("unknown sync version: {}", other)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionRepr {
    Text(String),
    Number(f64),
}

impl TryFrom<VersionRepr> for SyncVersion {
    type Error = String;

    fn try_from(repr: VersionRepr) -> Result<Self, Self::Error> {
        match repr {
            VersionRepr::Text(text) => text.parse(),
            VersionRepr::Number(n) if n == 1.0 || n == 10.0 => Ok(SyncVersion::Sync10),
            VersionRepr::Number(n) if n == 1.5 || n == 15.0 => Ok(SyncVersion::Sync15),
            VersionRepr::Number(n) => Err(format!("unknown sync version: {}", n)),
        }
    }
}

impl fmt::Display for SyncVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncVersion::Sync10 => f.write_str("1.0"),
            SyncVersion::Sync15 => f.write_str("1.5"),
        }
    }
}

/// Lightweight result of a create operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(rename = "type")]
    pub doc_type: EntryType,
    pub name: String,
    pub version: i64,
}

/// Identifiers become file names; refuse anything that is not a plain component
pub fn check_id(id: &str) -> Result<(), ApiError> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(ApiError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Split an upload filename into display name and lowercased extension
///
/// Only the final path component counts. A name without an extension, or a
/// dotfile such as `.hidden`, yields an empty extension.
pub fn split_extension(filename: &str) -> (&str, String) {
    let base = match std::path::Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
    {
        Some(base) => base,
        None => return (filename, String::new()),
    };
    match base.rsplit_once('.') {
        Some((name, ext)) if !name.is_empty() && !ext.is_empty() => {
            (name, ext.to_lowercase())
        }
        _ => (base, String::new()),
    }
}
