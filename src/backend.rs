//! Uniform document operations over both storage strategies
//!
//! `Backend10` drives the legacy per-document archives, `Backend15` the
//! content-addressed tree. Callers pick one per user through `SyncVersion`
//! and see the same contract either way.

pub mod v10;
pub mod v15;
pub mod view;

pub use v10::Backend10;
pub use v15::Backend15;
pub use view::{Directory, DocumentEntry, DocumentTree, Entry, FlatDoc};

use crate::blob::BlobStorage;
use crate::config::StorageConfig;
use crate::error::ApiError;
use crate::legacy::FileSystemStorage;
use crate::metadata::MetadataFile;
use crate::notify::NotificationHub;
use crate::store::SledTreeCache;
use crate::types::{Document, SyncVersion, TRASH_PARENT};
use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

/// Device name stamped on notifications raised by this service
pub const WEB_DEVICE: &str = "web";

pub trait DocumentBackend: Send + Sync {
    fn list_tree(&self, uid: &str) -> Result<DocumentTree, ApiError>;
    fn get_metadata(&self, uid: &str, id: &str) -> Result<MetadataFile, ApiError>;
    fn export(&self, uid: &str, id: &str, format: &str)
        -> Result<Box<dyn Read + Send>, ApiError>;
    fn create_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError>;
    fn create_folder(&self, uid: &str, name: &str, parent: &str) -> Result<Document, ApiError>;
    fn update_document(&self, uid: &str, id: &str, name: &str, parent: &str)
        -> Result<(), ApiError>;
    fn delete(&self, uid: &str, id: &str) -> Result<(), ApiError>;

    /// Returns whether anything changed; renaming to the current name is a no-op
    fn rename(&self, uid: &str, id: &str, name: &str) -> Result<bool, ApiError>;

    /// Returns whether anything changed; the target must be a folder or the root
    fn move_document(&self, uid: &str, id: &str, parent: &str) -> Result<bool, ApiError>;

    /// Ask the user's other devices to sync
    fn sync(&self, uid: &str);
}

/// Backend chosen by sync version
pub enum Backend {
    V10(Backend10),
    V15(Backend15),
}

impl Backend {
    pub fn open(
        version: SyncVersion,
        config: &StorageConfig,
        hub: Arc<dyn NotificationHub>,
    ) -> Result<Self, ApiError> {
        let extensions = config.normalized_extensions();
        match version {
            SyncVersion::Sync10 => Ok(Backend::V10(Backend10::new(
                Arc::new(FileSystemStorage::new(&config.data_dir, extensions)),
                hub,
            ))),
            SyncVersion::Sync15 => {
                let cache = SledTreeCache::new(config.cache_path())?;
                Ok(Backend::V15(Backend15::new(
                    BlobStorage::new(&config.data_dir, extensions, cache),
                    hub,
                )))
            }
        }
    }

    pub fn version(&self) -> SyncVersion {
        match self {
            Backend::V10(_) => SyncVersion::Sync10,
            Backend::V15(_) => SyncVersion::Sync15,
        }
    }

    fn inner(&self) -> &dyn DocumentBackend {
        match self {
            Backend::V10(b) => b as &dyn DocumentBackend,
            Backend::V15(b) => b,
        }
    }
}

impl DocumentBackend for Backend {
    fn list_tree(&self, uid: &str) -> Result<DocumentTree, ApiError> {
        self.inner().list_tree(uid)
    }

    fn get_metadata(&self, uid: &str, id: &str) -> Result<MetadataFile, ApiError> {
        self.inner().get_metadata(uid, id)
    }

    fn export(
        &self,
        uid: &str,
        id: &str,
        format: &str,
    ) -> Result<Box<dyn Read + Send>, ApiError> {
        self.inner().export(uid, id, format)
    }

    fn create_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError> {
        self.inner().create_document(uid, filename, parent, stream)
    }

    fn create_folder(&self, uid: &str, name: &str, parent: &str) -> Result<Document, ApiError> {
        self.inner().create_folder(uid, name, parent)
    }

    fn update_document(
        &self,
        uid: &str,
        id: &str,
        name: &str,
        parent: &str,
    ) -> Result<(), ApiError> {
        self.inner().update_document(uid, id, name, parent)
    }

    fn delete(&self, uid: &str, id: &str) -> Result<(), ApiError> {
        self.inner().delete(uid, id)
    }

    fn rename(&self, uid: &str, id: &str, name: &str) -> Result<bool, ApiError> {
        self.inner().rename(uid, id, name)
    }

    fn move_document(&self, uid: &str, id: &str, parent: &str) -> Result<bool, ApiError> {
        self.inner().move_document(uid, id, parent)
    }

    fn sync(&self, uid: &str) {
        self.inner().sync(uid)
    }
}

/// Parents that need no lookup: the root and the trash
fn is_builtin_parent(parent: &str) -> bool {
    parent.is_empty() || parent == TRASH_PARENT
}

/// Accept the root, the trash, or an existing folder as a destination
///
/// `lookup` fetches the parent's metadata; a missing parent is reported as
/// an invalid parent rather than a missing document.
pub(crate) fn check_parent_with<F>(parent: &str, lookup: F) -> Result<(), ApiError>
where
    F: FnOnce() -> Result<MetadataFile, ApiError>,
{
    if is_builtin_parent(parent) {
        return Ok(());
    }
    match lookup() {
        Ok(metadata) if metadata.is_collection() => Ok(()),
        Ok(_) | Err(ApiError::DocumentNotFound(_)) => {
            Err(ApiError::InvalidParent(parent.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Refuse a move that would put `id` under itself or one of its descendants
///
/// Walks up from `parent` through `parent_of` until a builtin parent or an
/// unknown document is reached.
pub(crate) fn check_not_descendant<F>(id: &str, parent: &str, mut parent_of: F) -> Result<(), ApiError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut seen = HashSet::new();
    let mut current = parent.to_string();
    while !is_builtin_parent(&current) {
        if current == id {
            return Err(ApiError::InvalidParent(parent.to_string()));
        }
        if !seen.insert(current.clone()) {
            break;
        }
        match parent_of(&current) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(())
}
