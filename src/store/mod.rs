//! Content Store
//!
//! Hash-addressed blob access used by reconciliation and the v2 backend,
//! plus the per-user cache of the last reconciled tree.

pub mod blob;
pub mod persistence;

pub use blob::{FsBlobStore, MemoryBlobStore, RootPointer};
pub use persistence::SledTreeCache;

use crate::error::StorageError;
use crate::types::Hash;
use std::io::Read;

/// Read-only hash → bytes lookup
///
/// Implementations must be safe to share between concurrent readers.
pub trait RemoteStorage: Send + Sync {
    /// Open the blob stored under `hash`; `StorageError::NotFound` when absent
    fn get_reader(&self, hash: &str) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Read a whole blob into memory
    fn get_bytes(&self, hash: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_reader(hash)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Writable content store with a movable root pointer
pub trait BlobStore: RemoteStorage {
    /// Store bytes under their digest; existing blobs are left untouched
    fn put(&self, data: &[u8]) -> Result<Hash, StorageError>;

    /// Store a stream under its digest, returning the digest and size
    fn put_reader(&self, reader: &mut dyn Read) -> Result<(Hash, u64), StorageError>;

    fn exists(&self, hash: &str) -> Result<bool, StorageError>;

    /// Current root of the user's tree, if one was ever published
    fn root(&self) -> Result<Option<RootPointer>, StorageError>;

    /// Publish a new root
    fn set_root(&self, root: &RootPointer) -> Result<(), StorageError>;
}

/// True when `hash` looks like a SHA-256 content address
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
