//! Document manifests

use crate::error::StorageError;
use crate::metadata::MetadataFile;
use crate::tree::entry::HashEntry;
use crate::tree::hasher;
use crate::tree::index::IndexReader;
use crate::types::{
    DocumentId, EntryType, Hash, EPUB_FILE_EXT, METADATA_FILE_EXT, PDF_FILE_EXT,
};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// One document's manifest: its own entry, its files and decoded metadata
///
/// `files` is kept sorted by entry name with unique names, and `entry.hash`
/// is the digest of that listing. Every mutation goes through a method that
/// rehashes before returning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashDoc {
    pub(crate) entry: HashEntry,
    pub(crate) files: Vec<HashEntry>,
    pub metadata: MetadataFile,
}

impl HashDoc {
    /// Empty manifest for a new document or folder
    pub fn new(name: impl Into<String>, document_id: impl Into<DocumentId>, kind: EntryType) -> Self {
        Self {
            entry: HashEntry::doc(document_id, String::new(), 0),
            files: Vec::new(),
            metadata: MetadataFile {
                document_name: name.into(),
                collection_type: kind,
                ..Default::default()
            },
        }
    }

    /// Empty manifest carrying existing metadata
    pub fn with_metadata(document_id: impl Into<DocumentId>, metadata: MetadataFile) -> Self {
        Self {
            entry: HashEntry::doc(document_id, String::new(), 0),
            files: Vec::new(),
            metadata,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.entry_name
    }

    pub fn hash(&self) -> &str {
        &self.entry.hash
    }

    pub fn files(&self) -> &[HashEntry] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Recompute the manifest hash from the current listing
    pub fn rehash(&mut self) -> Result<(), StorageError> {
        let hash = hasher::hash_entries(&self.files)?;
        debug!(doc = %self.metadata.document_name, hash = %hash, "new doc hash");
        self.entry.hash = hash;
        self.entry.subfiles = self.files.len();
        Ok(())
    }

    /// Add a file (replacing any file of the same name) and rehash
    pub fn add_file(&mut self, entry: HashEntry) -> Result<(), StorageError> {
        match self
            .files
            .binary_search_by(|f| f.entry_name.as_str().cmp(entry.entry_name.as_str()))
        {
            Ok(pos) => self.files[pos] = entry,
            Err(pos) => self.files.insert(pos, entry),
        }
        self.rehash()
    }

    /// Replace the whole listing and rehash
    pub(crate) fn set_files(&mut self, mut files: Vec<HashEntry>) -> Result<(), StorageError> {
        files.sort_by(|a, b| a.entry_name.cmp(&b.entry_name));
        files.dedup_by(|a, b| a.entry_name == b.entry_name);
        self.files = files;
        self.rehash()
    }

    /// Serialize the metadata and re-point the metadata file entry at it
    ///
    /// Returns the metadata digest and a reader over the exact bytes hashed.
    /// The manifest is rehashed so its address follows the new metadata.
    pub fn metadata_reader(&mut self) -> Result<(Hash, Cursor<Vec<u8>>), StorageError> {
        let json = self
            .metadata
            .to_json()
            .map_err(|e| StorageError::Hashing(format!("cannot encode metadata: {}", e)))?;
        let hash = hasher::compute_hash(&json);

        let entry = self
            .files
            .iter_mut()
            .find(|f| f.has_suffix(METADATA_FILE_EXT))
            .ok_or_else(|| StorageError::MetadataEntryNotFound(self.entry.entry_name.clone()))?;
        entry.hash = hash.clone();
        debug!(doc = %self.entry.entry_name, hash = %hash, "metadata rehashed");

        self.rehash()?;
        Ok((hash, Cursor::new(json)))
    }

    /// Replace the metadata wholesale; the caller re-uploads via `metadata_reader`
    pub fn replace_metadata(&mut self, metadata: MetadataFile) {
        self.metadata = metadata;
    }

    /// Stream the manifest in index form
    pub fn index_reader(&self) -> Result<IndexReader, StorageError> {
        if self.files.is_empty() {
            return Err(StorageError::EmptyManifest(self.entry.entry_name.clone()));
        }
        IndexReader::from_entries(&self.files)
    }

    /// This document as a line of the root index
    pub fn line(&self) -> Result<String, StorageError> {
        self.tree_entry().line()
    }

    /// Entry describing this document inside a tree listing
    pub fn tree_entry(&self) -> HashEntry {
        HashEntry::doc(self.entry.entry_name.clone(), self.entry.hash.clone(), self.files.len())
    }

    /// The uploaded payload (pdf/epub), if any
    pub fn payload_entry(&self) -> Option<&HashEntry> {
        self.files
            .iter()
            .find(|f| f.has_suffix(PDF_FILE_EXT) || f.has_suffix(EPUB_FILE_EXT))
    }
}
