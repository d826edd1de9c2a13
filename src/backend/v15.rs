//! Backend over the content-addressed tree.

use crate::backend::view::DocumentTree;
use crate::backend::DocumentBackend;
use crate::blob::BlobStorage;
use crate::error::ApiError;
use crate::metadata::MetadataFile;
use crate::notify::NotificationHub;
use crate::types::Document;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

pub struct Backend15 {
    blobs: BlobStorage,
    hub: Arc<dyn NotificationHub>,
}

impl Backend15 {
    pub fn new(blobs: BlobStorage, hub: Arc<dyn NotificationHub>) -> Self {
        Self { blobs, hub }
    }

    pub fn blobs(&self) -> &BlobStorage {
        &self.blobs
    }
}

impl DocumentBackend for Backend15 {
    fn list_tree(&self, uid: &str) -> Result<DocumentTree, ApiError> {
        let tree = self.blobs.get_cached_tree(uid)?;
        Ok(DocumentTree::from_hash_tree(&tree))
    }

    fn get_metadata(&self, uid: &str, id: &str) -> Result<MetadataFile, ApiError> {
        self.blobs.get_blob_metadata(uid, id)
    }

    /// Always the uploaded payload; the tree keeps no other export form
    fn export(
        &self,
        uid: &str,
        id: &str,
        format: &str,
    ) -> Result<Box<dyn Read + Send>, ApiError> {
        debug!(uid, doc_id = %id, format, "export");
        self.blobs.export(uid, id)
    }

    // Parent, folder and move rules are checked by `BlobStorage` under the
    // user's lock, against the same tree the mutation publishes.
    fn create_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError> {
        self.blobs.create_blob_document(uid, filename, parent, stream)
    }

    fn create_folder(&self, uid: &str, name: &str, parent: &str) -> Result<Document, ApiError> {
        self.blobs.create_blob_folder(uid, name, parent)
    }

    fn update_document(
        &self,
        uid: &str,
        id: &str,
        name: &str,
        parent: &str,
    ) -> Result<(), ApiError> {
        self.blobs.update_blob_document(uid, id, name, parent)
    }

    fn delete(&self, uid: &str, id: &str) -> Result<(), ApiError> {
        self.blobs.delete_blob_document(uid, id)
    }

    fn rename(&self, uid: &str, id: &str, name: &str) -> Result<bool, ApiError> {
        self.blobs.rename_blob_document(uid, id, name)
    }

    fn move_document(&self, uid: &str, id: &str, parent: &str) -> Result<bool, ApiError> {
        self.blobs.move_blob_document(uid, id, parent)
    }

    fn sync(&self, uid: &str) {
        self.hub.notify_sync(uid, &uuid::Uuid::new_v4().to_string());
    }
}
