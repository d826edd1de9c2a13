//! Reconciliation of cached manifests against a remote listing
//!
//! Both levels run the same name-keyed three-way diff: entries whose hash is
//! unchanged are kept verbatim, changed entries are refreshed, entries missing
//! remotely are dropped and new remote entries are added. Content hashes are
//! the only change signal, so metadata is fetched only for entries whose
//! content actually moved.
//!
//! The remote hash stays authoritative after a mirror (it is the address the
//! remote store knows the listing by). The local digest is recomputed anyway
//! and a disagreement is logged and counted in `hash_mismatches`.

use crate::error::StorageError;
use crate::metadata::MetadataFile;
use crate::store::RemoteStorage;
use crate::tree::doc::HashDoc;
use crate::tree::entry::HashEntry;
use crate::tree::hashtree::HashTree;
use crate::tree::index::parse_index;
use crate::types::METADATA_FILE_EXT;
use std::collections::HashMap;
use std::ops::AddAssign;
use tracing::{debug, instrument, warn};

/// What a mirror pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub retained: usize,
    pub updated: usize,
    pub added: usize,
    pub removed: usize,
    pub metadata_refreshed: usize,
    pub metadata_decode_failures: usize,
    pub hash_mismatches: usize,
}

impl MirrorStats {
    /// True when the pass left the listing exactly as it was
    pub fn is_noop(&self) -> bool {
        self.updated == 0 && self.added == 0 && self.removed == 0
    }
}

impl AddAssign for MirrorStats {
    fn add_assign(&mut self, other: Self) {
        self.retained += other.retained;
        self.updated += other.updated;
        self.added += other.added;
        self.removed += other.removed;
        self.metadata_refreshed += other.metadata_refreshed;
        self.metadata_decode_failures += other.metadata_decode_failures;
        self.hash_mismatches += other.hash_mismatches;
    }
}

/// Result of hydrating metadata from one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// The entry is not a metadata file; nothing was fetched
    NotMetadata,
    /// Metadata was decoded and replaced
    Refreshed,
    /// The blob was fetched but did not decode; the previous metadata stays
    DecodeFailed,
}

impl HashDoc {
    /// Replace this document's metadata from `entry` if it is a metadata file
    ///
    /// Fetch errors propagate. Decode errors are logged and reported as
    /// `MetadataOutcome::DecodeFailed` so one corrupt record cannot block the
    /// rest of a sync.
    pub fn read_metadata(
        &mut self,
        entry: &HashEntry,
        store: &dyn RemoteStorage,
    ) -> Result<MetadataOutcome, StorageError> {
        if !entry.has_suffix(METADATA_FILE_EXT) {
            return Ok(MetadataOutcome::NotMetadata);
        }
        let bytes = store.get_bytes(&entry.hash)?;
        match serde_json::from_slice::<MetadataFile>(&bytes) {
            Ok(metadata) => {
                debug!(doc = %self.id(), name = %metadata.document_name, "metadata refreshed");
                self.metadata = metadata;
                Ok(MetadataOutcome::Refreshed)
            }
            Err(e) => {
                warn!(
                    doc = %self.id(),
                    entry = %entry.entry_name,
                    hash = %entry.hash,
                    error = %e,
                    "cannot decode metadata, keeping previous"
                );
                Ok(MetadataOutcome::DecodeFailed)
            }
        }
    }

    /// Align this manifest with the remote listing addressed by `remote.hash`
    ///
    /// The remote name is adopted before anything is fetched.
    #[instrument(skip(self, store), fields(doc_id = %remote.entry_name, hash = %remote.hash))]
    pub fn mirror(
        &mut self,
        remote: &HashEntry,
        store: &dyn RemoteStorage,
    ) -> Result<MirrorStats, StorageError> {
        self.entry.entry_name = remote.entry_name.clone();
        let remote_files = parse_index(store.get_reader(&remote.hash)?)?;
        let mut remote_by_name: HashMap<&str, &HashEntry> = remote_files
            .iter()
            .map(|e| (e.entry_name.as_str(), e))
            .collect();

        let mut stats = MirrorStats::default();
        let local = self.files.clone();
        let mut next = Vec::with_capacity(remote_files.len());

        for current in local {
            match remote_by_name.remove(current.entry_name.as_str()) {
                Some(theirs) if theirs.hash == current.hash => {
                    stats.retained += 1;
                    next.push(current);
                }
                Some(theirs) => {
                    self.track_metadata(theirs, store, &mut stats)?;
                    stats.updated += 1;
                    next.push(theirs.clone());
                }
                None => {
                    debug!(entry = %current.entry_name, "dropped");
                    stats.removed += 1;
                }
            }
        }

        for theirs in remote_files.iter() {
            if !remote_by_name.contains_key(theirs.entry_name.as_str()) {
                continue;
            }
            self.track_metadata(theirs, store, &mut stats)?;
            stats.added += 1;
            next.push(theirs.clone());
        }

        self.set_files(next)?;
        if self.entry.hash != remote.hash {
            warn!(
                local = %self.entry.hash,
                remote = %remote.hash,
                "manifest digest differs from remote address"
            );
            stats.hash_mismatches += 1;
            self.entry.hash = remote.hash.clone();
        }

        debug!(?stats, "doc mirrored");
        Ok(stats)
    }

    fn track_metadata(
        &mut self,
        entry: &HashEntry,
        store: &dyn RemoteStorage,
        stats: &mut MirrorStats,
    ) -> Result<(), StorageError> {
        match self.read_metadata(entry, store)? {
            MetadataOutcome::Refreshed => stats.metadata_refreshed += 1,
            MetadataOutcome::DecodeFailed => stats.metadata_decode_failures += 1,
            MetadataOutcome::NotMetadata => {}
        }
        Ok(())
    }
}

impl HashTree {
    /// Align the whole tree with the remote root index at `root_hash`
    ///
    /// Document counts go in `retained`/`updated`/`added`/`removed`; the
    /// metadata and mismatch counters aggregate over every mirrored document.
    #[instrument(skip(self, store), fields(hash = %root_hash))]
    pub fn mirror(
        &mut self,
        root_hash: &str,
        store: &dyn RemoteStorage,
    ) -> Result<MirrorStats, StorageError> {
        let mut stats = MirrorStats::default();
        if self.hash == root_hash {
            stats.retained = self.docs.len();
            debug!("tree already current");
            return Ok(stats);
        }

        let remote_docs = parse_index(store.get_reader(root_hash)?)?;
        let mut remote_by_id: HashMap<&str, &HashEntry> = remote_docs
            .iter()
            .map(|e| (e.entry_name.as_str(), e))
            .collect();

        // Work on a copy so a failed fetch leaves the cached tree untouched.
        let local = self.docs.clone();
        let mut next = Vec::with_capacity(remote_docs.len());

        for mut doc in local {
            match remote_by_id.remove(doc.id()) {
                Some(theirs) if theirs.hash == doc.hash() => {
                    stats.retained += 1;
                    next.push(doc);
                }
                Some(theirs) => {
                    stats += doc_counters(doc.mirror(theirs, store)?);
                    if doc.is_empty() {
                        warn!(doc_id = %doc.id(), "remote document has no files, dropped");
                        stats.removed += 1;
                        continue;
                    }
                    stats.updated += 1;
                    next.push(doc);
                }
                None => {
                    debug!(doc_id = %doc.id(), "document dropped");
                    stats.removed += 1;
                }
            }
        }

        for theirs in remote_docs.iter() {
            if !remote_by_id.contains_key(theirs.entry_name.as_str()) {
                continue;
            }
            let mut doc = HashDoc::with_metadata(theirs.entry_name.clone(), MetadataFile::default());
            stats += doc_counters(doc.mirror(theirs, store)?);
            if doc.is_empty() {
                warn!(doc_id = %theirs.entry_name, "remote document has no files, skipped");
                continue;
            }
            stats.added += 1;
            next.push(doc);
        }

        self.docs = next;
        self.sort_docs();
        self.rehash()?;
        if self.hash != root_hash {
            warn!(local = %self.hash, remote = %root_hash, "tree digest differs from remote root");
            stats.hash_mismatches += 1;
            self.hash = root_hash.to_string();
        }

        debug!(?stats, docs = self.docs.len(), "tree mirrored");
        Ok(stats)
    }
}

/// Keep only the counters that aggregate across documents
fn doc_counters(doc_stats: MirrorStats) -> MirrorStats {
    MirrorStats {
        metadata_refreshed: doc_stats.metadata_refreshed,
        metadata_decode_failures: doc_stats.metadata_decode_failures,
        hash_mismatches: doc_stats.hash_mismatches,
        ..MirrorStats::default()
    }
}
