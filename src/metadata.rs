//! Metadata domain contracts.
//!
//! Owns the document metadata record hashed into manifests and the legacy
//! per-document record written next to v1 archives.

pub mod document;
pub mod raw;

pub use document::MetadataFile;
pub use raw::RawMetadata;
