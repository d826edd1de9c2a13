//! Persistence layer for cached user trees

use crate::error::StorageError;
use crate::tree::HashTree;
use bincode;
use sled;
use std::path::Path;

/// Sled-backed cache of the last reconciled `HashTree` per user
///
/// The cache is an optimization only: losing it means the next request
/// mirrors from the published root again.
pub struct SledTreeCache {
    db: sled::Db,
}

impl SledTreeCache {
    /// Open (or create) the cache database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Ok(Self { db })
    }

    /// Cached tree for `uid`, if any
    pub fn get(&self, uid: &str) -> Result<Option<HashTree>, StorageError> {
        match self.db.get(uid.as_bytes()).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to get cached tree: {}", e),
            ))
        })? {
            Some(value) => {
                let tree: HashTree = bincode::deserialize(&value).map_err(|e| {
                    StorageError::IoError(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("Failed to deserialize cached tree: {}", e),
                    ))
                })?;
                Ok(Some(tree))
            }
            None => Ok(None),
        }
    }

    pub fn put(&self, uid: &str, tree: &HashTree) -> Result<(), StorageError> {
        let value = bincode::serialize(tree).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to serialize tree: {}", e),
            ))
        })?;
        self.db.insert(uid.as_bytes(), value).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to cache tree: {}", e),
            ))
        })?;
        Ok(())
    }

    /// Forget the cached tree for `uid`
    pub fn remove(&self, uid: &str) -> Result<(), StorageError> {
        self.db.remove(uid.as_bytes()).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to drop cached tree: {}", e),
            ))
        })?;
        Ok(())
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to flush store: {}", e),
            ))
        })?;
        Ok(())
    }
}
