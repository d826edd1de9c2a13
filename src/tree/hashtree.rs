//! Per-user document tree

use crate::error::StorageError;
use crate::tree::doc::HashDoc;
use crate::tree::entry::HashEntry;
use crate::tree::hasher;
use crate::tree::index::{IndexReader, SCHEMA_VERSION};
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A user's whole collection of document manifests
///
/// `hash` is the digest of the root index (one line per document, sorted by
/// document id). `generation` is bumped by the storage layer whenever the
/// root pointer moves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HashTree {
    pub hash: Hash,
    pub generation: u64,
    pub(crate) docs: Vec<HashDoc>,
}

impl HashTree {
    pub fn new() -> Self {
        let empty_index = format!("{}\n", SCHEMA_VERSION);
        Self {
            hash: hasher::compute_hash(empty_index.as_bytes()),
            ..Self::default()
        }
    }

    pub fn docs(&self) -> &[HashDoc] {
        &self.docs
    }

    pub fn find_doc(&self, id: &str) -> Option<&HashDoc> {
        self.docs.iter().find(|d| d.id() == id)
    }

    pub fn find_doc_mut(&mut self, id: &str) -> Option<&mut HashDoc> {
        self.docs.iter_mut().find(|d| d.id() == id)
    }

    /// Add (or replace) a document; empty manifests are refused
    pub fn add(&mut self, doc: HashDoc) -> Result<(), StorageError> {
        if doc.is_empty() {
            return Err(StorageError::EmptyManifest(doc.id().to_string()));
        }
        match self.docs.binary_search_by(|d| d.id().cmp(doc.id())) {
            Ok(pos) => self.docs[pos] = doc,
            Err(pos) => self.docs.insert(pos, doc),
        }
        self.rehash()
    }

    /// Drop a document from the tree
    pub fn remove(&mut self, id: &str) -> Result<Option<HashDoc>, StorageError> {
        let removed = match self.docs.iter().position(|d| d.id() == id) {
            Some(pos) => Some(self.docs.remove(pos)),
            None => None,
        };
        if removed.is_some() {
            self.rehash()?;
        }
        Ok(removed)
    }

    /// Mutate one document in place; the tree is rehashed afterwards
    pub fn update_doc<T, F>(&mut self, id: &str, f: F) -> Result<Option<T>, StorageError>
    where
        F: FnOnce(&mut HashDoc) -> Result<T, StorageError>,
    {
        let result = match self.docs.iter_mut().find(|d| d.id() == id) {
            Some(doc) => f(doc),
            None => return Ok(None),
        };
        // A failed closure may still have touched the listing.
        self.rehash()?;
        result.map(Some)
    }

    /// Recompute the tree hash from the document entries
    pub fn rehash(&mut self) -> Result<(), StorageError> {
        let entries = self.entries();
        let hash = hasher::hash_entries(&entries)?;
        debug!(hash = %hash, docs = self.docs.len(), "new tree hash");
        self.hash = hash;
        Ok(())
    }

    /// Root index entries, one per document
    pub fn entries(&self) -> Vec<HashEntry> {
        self.docs.iter().map(HashDoc::tree_entry).collect()
    }

    /// Stream the root index; an empty tree yields only the header
    pub fn index_reader(&self) -> Result<IndexReader, StorageError> {
        IndexReader::from_entries(&self.entries())
    }

    pub(crate) fn sort_docs(&mut self) {
        self.docs.sort_by(|a, b| a.id().cmp(b.id()));
    }
}
