//! Backend over legacy per-document archives.

use crate::backend::view::DocumentTree;
use crate::backend::{check_not_descendant, check_parent_with, DocumentBackend, WEB_DEVICE};
use crate::concurrency::UserLockManager;
use crate::error::ApiError;
use crate::legacy::DocumentHandler;
use crate::metadata::{MetadataFile, RawMetadata};
use crate::notify::{DocumentNotification, EventType, NotificationHub};
use crate::types::{Document, EntryType};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::info;

pub struct Backend10 {
    documents: Arc<dyn DocumentHandler>,
    hub: Arc<dyn NotificationHub>,
    locks: UserLockManager,
}

impl Backend10 {
    pub fn new(documents: Arc<dyn DocumentHandler>, hub: Arc<dyn NotificationHub>) -> Self {
        Self {
            documents,
            hub,
            locks: UserLockManager::new(),
        }
    }

    fn check_parent(&self, uid: &str, parent: &str) -> Result<(), ApiError> {
        check_parent_with(parent, || {
            Ok(self.documents.get_metadata(uid, parent)?.to_metadata_file())
        })
    }

    /// Parent checks plus a walk up from `parent` so `id` never lands under itself
    fn check_move(&self, uid: &str, id: &str, parent: &str) -> Result<(), ApiError> {
        self.check_parent(uid, parent)?;
        let parents: HashMap<String, String> = self
            .documents
            .get_all_metadata(uid)?
            .into_iter()
            .map(|r| (r.id, r.parent))
            .collect();
        check_not_descendant(id, parent, |current| parents.get(current).cloned())
    }

    /// Persist a changed record with a fresh timestamp and tell the other devices
    fn store(&self, uid: &str, mut raw: RawMetadata) -> Result<(), ApiError> {
        raw.modified_client = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);
        self.documents.update_metadata(uid, &raw)?;
        self.notify(uid, &raw, EventType::DocumentAdded);
        Ok(())
    }

    fn notify(&self, uid: &str, raw: &RawMetadata, event: EventType) {
        let notification = DocumentNotification {
            id: raw.id.clone(),
            doc_type: raw.doc_type,
            version: raw.version,
            parent: raw.parent.clone(),
            name: raw.visible_name.clone(),
        };
        self.hub.notify(uid, WEB_DEVICE, notification, event);
    }

    fn notify_created(&self, uid: &str, doc: &Document, parent: &str) {
        let notification = DocumentNotification {
            id: doc.id.clone(),
            doc_type: doc.doc_type,
            version: doc.version,
            parent: parent.to_string(),
            name: doc.name.clone(),
        };
        self.hub
            .notify(uid, WEB_DEVICE, notification, EventType::DocumentAdded);
    }
}

impl DocumentBackend for Backend10 {
    fn list_tree(&self, uid: &str) -> Result<DocumentTree, ApiError> {
        let records = self.documents.get_all_metadata(uid)?;
        Ok(DocumentTree::from_raw(&records))
    }

    fn get_metadata(&self, uid: &str, id: &str) -> Result<MetadataFile, ApiError> {
        Ok(self.documents.get_metadata(uid, id)?.to_metadata_file())
    }

    fn export(
        &self,
        uid: &str,
        id: &str,
        format: &str,
    ) -> Result<Box<dyn Read + Send>, ApiError> {
        let reader = self.documents.export_document(uid, id, format)?;
        info!(uid, doc_id = %id, format, "exported document");
        Ok(reader)
    }

    fn create_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        self.check_parent(uid, parent)?;
        let doc = self.documents.create_document(uid, filename, parent, stream)?;
        info!(uid, doc_id = %doc.id, "uploaded document");
        self.notify_created(uid, &doc, parent);
        Ok(doc)
    }

    fn create_folder(&self, uid: &str, name: &str, parent: &str) -> Result<Document, ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        self.check_parent(uid, parent)?;
        let doc = self.documents.create_folder(uid, name, parent)?;
        info!(uid, doc_id = %doc.id, "created folder");
        self.notify_created(uid, &doc, parent);
        Ok(doc)
    }

    fn update_document(
        &self,
        uid: &str,
        id: &str,
        name: &str,
        parent: &str,
    ) -> Result<(), ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        self.check_move(uid, id, parent)?;
        let mut raw = self.documents.get_metadata(uid, id)?;
        raw.visible_name = name.to_string();
        raw.parent = parent.to_string();
        raw.version += 1;
        self.store(uid, raw)?;
        info!(uid, doc_id = %id, "updated document");
        Ok(())
    }

    fn delete(&self, uid: &str, id: &str) -> Result<(), ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        let raw = self.documents.get_metadata(uid, id)?;
        if raw.doc_type == EntryType::Collection {
            let has_children = self
                .documents
                .get_all_metadata(uid)?
                .iter()
                .any(|r| r.parent == raw.id);
            if has_children {
                return Err(ApiError::NonEmptyFolder(id.to_string()));
            }
        }

        self.documents.remove_document(uid, id)?;
        info!(uid, doc_id = %id, name = %raw.visible_name, "document deleted");
        self.notify(uid, &raw, EventType::DocumentDeleted);
        Ok(())
    }

    fn rename(&self, uid: &str, id: &str, name: &str) -> Result<bool, ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        let mut raw = self.documents.get_metadata(uid, id)?;
        if raw.visible_name == name {
            return Ok(false);
        }
        raw.visible_name = name.to_string();
        raw.version += 1;
        self.store(uid, raw)?;
        Ok(true)
    }

    fn move_document(&self, uid: &str, id: &str, parent: &str) -> Result<bool, ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        self.check_move(uid, id, parent)?;
        let mut raw = self.documents.get_metadata(uid, id)?;
        if raw.parent == parent {
            return Ok(false);
        }
        raw.parent = parent.to_string();
        raw.version += 1;
        self.store(uid, raw)?;
        Ok(true)
    }

    fn sync(&self, _uid: &str) {
        // Legacy devices poll; nothing to push.
    }
}
