//! Blob store implementations
//!
//! `FsBlobStore` keeps one file per blob, named by its digest:
//! `{root}/{hash}`, with the published tree root in `{root}/root`.
//! Writes go to a temporary file first and are renamed into place, so a blob
//! is either absent or complete.

use crate::error::StorageError;
use crate::store::{is_valid_hash, BlobStore, RemoteStorage};
use crate::tree::hasher::{self, HashingWriter};
use crate::types::Hash;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const ROOT_FILE: &str = "root";

/// Published root of a user's tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPointer {
    pub hash: Hash,
    pub generation: u64,
}

/// Filesystem-backed content store for one user
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            StorageError::IoError(io::Error::new(
                e.kind(),
                format!("Failed to create blob directory at {:?}: {}", root, e),
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, hash: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_hash(hash) {
            return Err(StorageError::NotFound(hash.to_string()));
        }
        Ok(self.root.join(hash))
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join(format!(".{}.tmp", uuid::Uuid::new_v4()))
    }

    fn commit(&self, temp_path: &Path, final_path: &Path) -> Result<(), StorageError> {
        if final_path.exists() {
            let _ = fs::remove_file(temp_path);
            return Ok(());
        }
        fs::rename(temp_path, final_path).map_err(|e| {
            let _ = fs::remove_file(temp_path);
            StorageError::IoError(io::Error::new(
                e.kind(),
                format!("Failed to rename temp file to {:?}: {}", final_path, e),
            ))
        })
    }
}

impl RemoteStorage for FsBlobStore {
    fn get_reader(&self, hash: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let path = self.blob_path(hash)?;
        match fs::File::open(&path) {
            Ok(file) => Ok(Box::new(io::BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(hash.to_string()))
            }
            Err(e) => Err(StorageError::IoError(e)),
        }
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, data: &[u8]) -> Result<Hash, StorageError> {
        let hash = hasher::compute_hash(data);
        let final_path = self.blob_path(&hash)?;
        if final_path.exists() {
            return Ok(hash);
        }
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data) {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::IoError(e));
        }
        self.commit(&temp_path, &final_path)?;
        debug!(hash = %hash, size = data.len(), "stored blob");
        Ok(hash)
    }

    fn put_reader(&self, reader: &mut dyn Read) -> Result<(Hash, u64), StorageError> {
        let temp_path = self.temp_path();
        let mut copy = || -> Result<(Hash, u64), StorageError> {
            let file = fs::File::create(&temp_path)?;
            let mut writer = HashingWriter::new(io::BufWriter::new(file));
            io::copy(reader, &mut writer)?;
            let (buffered, hash, size) = writer.finish();
            buffered.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            Ok((hash, size))
        };
        let (hash, size) = match copy() {
            Ok(result) => result,
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                return Err(e);
            }
        };
        let final_path = self.blob_path(&hash)?;
        self.commit(&temp_path, &final_path)?;
        debug!(hash = %hash, size, "stored streamed blob");
        Ok((hash, size))
    }

    fn exists(&self, hash: &str) -> Result<bool, StorageError> {
        match self.blob_path(hash) {
            Ok(path) => Ok(path.exists()),
            Err(_) => Ok(false),
        }
    }

    fn root(&self) -> Result<Option<RootPointer>, StorageError> {
        let path = self.root.join(ROOT_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::IoError(e)),
        };
        let root = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to decode root pointer {:?}: {}", path, e),
            ))
        })?;
        Ok(Some(root))
    }

    fn set_root(&self, root: &RootPointer) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(root).map_err(|e| {
            StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, &bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(StorageError::IoError(e));
        }
        let final_path = self.root.join(ROOT_FILE);
        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::IoError(e)
        })?;
        debug!(hash = %root.hash, generation = root.generation, "root updated");
        Ok(())
    }
}

/// In-memory content store with per-hash read accounting
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<Hash, Vec<u8>>>,
    reads: RwLock<HashMap<Hash, usize>>,
    root: RwLock<Option<RootPointer>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert bytes under an arbitrary key, bypassing addressing
    pub fn put_raw(&self, hash: impl Into<Hash>, data: Vec<u8>) {
        self.blobs.write().insert(hash.into(), data);
    }

    /// How many times `hash` was opened through `get_reader`
    pub fn read_count(&self, hash: &str) -> usize {
        self.reads.read().get(hash).copied().unwrap_or(0)
    }

    /// Total number of opened blobs
    pub fn total_reads(&self) -> usize {
        self.reads.read().values().sum()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl RemoteStorage for MemoryBlobStore {
    fn get_reader(&self, hash: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        *self.reads.write().entry(hash.to_string()).or_insert(0) += 1;
        match self.blobs.read().get(hash) {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(StorageError::NotFound(hash.to_string())),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, data: &[u8]) -> Result<Hash, StorageError> {
        let hash = hasher::compute_hash(data);
        self.blobs
            .write()
            .entry(hash.clone())
            .or_insert_with(|| data.to_vec());
        Ok(hash)
    }

    fn put_reader(&self, reader: &mut dyn Read) -> Result<(Hash, u64), StorageError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let size = data.len() as u64;
        Ok((self.put(&data)?, size))
    }

    fn exists(&self, hash: &str) -> Result<bool, StorageError> {
        Ok(self.blobs.read().contains_key(hash))
    }

    fn root(&self) -> Result<Option<RootPointer>, StorageError> {
        Ok(self.root.read().clone())
    }

    fn set_root(&self, root: &RootPointer) -> Result<(), StorageError> {
        *self.root.write() = Some(root.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        let hash = store.put(b"blob content").unwrap();
        assert_eq!(hash, hasher::compute_hash(b"blob content"));
        assert_eq!(store.get_bytes(&hash).unwrap(), b"blob content");
        assert!(store.exists(&hash).unwrap());
    }

    #[test]
    fn test_put_is_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        let a = store.put(b"same").unwrap();
        let b = store.put(b"same").unwrap();
        assert_eq!(a, b);
        let files: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_put_reader_hashes_stream() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        let mut reader = Cursor::new(b"streamed payload".to_vec());
        let (hash, size) = store.put_reader(&mut reader).unwrap();
        assert_eq!(hash, hasher::compute_hash(b"streamed payload"));
        assert_eq!(size, 16);
        assert_eq!(store.get_bytes(&hash).unwrap(), b"streamed payload");
    }

    #[test]
    fn test_missing_blob_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        let missing = hasher::compute_hash(b"nothing");
        assert!(matches!(
            store.get_reader(&missing),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_hash_never_touches_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        assert!(matches!(
            store.get_reader("../root"),
            Err(StorageError::NotFound(_))
        ));
        assert!(!store.exists("../root").unwrap());
    }

    #[test]
    fn test_root_pointer_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(temp_dir.path()).unwrap();

        assert!(store.root().unwrap().is_none());
        let root = RootPointer {
            hash: hasher::compute_hash(b"tree"),
            generation: 3,
        };
        store.set_root(&root).unwrap();
        assert_eq!(store.root().unwrap(), Some(root));
    }

    #[test]
    fn test_memory_store_counts_reads() {
        let store = MemoryBlobStore::new();
        let hash = store.put(b"x").unwrap();
        store.get_bytes(&hash).unwrap();
        store.get_bytes(&hash).unwrap();
        assert_eq!(store.read_count(&hash), 2);
        assert!(store.get_reader("missing").is_err());
        assert_eq!(store.total_reads(), 3);
    }
}
