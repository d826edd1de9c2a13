//! Content-addressed (sync v2) storage
//!
//! Each user owns a blob directory (`{data_dir}/users/{uid}/sync/`) and a
//! root pointer naming the current tree. Every mutation uploads the changed
//! blobs, rehashes the document and the tree, bumps the generation and swaps
//! the root. The last reconciled tree is cached per user so a read only
//! fetches what changed since.

use crate::backend::{check_not_descendant, check_parent_with};
use crate::concurrency::UserLockManager;
use crate::error::{ApiError, StorageError};
use crate::legacy::archive::{content_template, folder_content};
use crate::metadata::document::now_millis_string;
use crate::metadata::MetadataFile;
use crate::store::{BlobStore, FsBlobStore, RemoteStorage, RootPointer, SledTreeCache};
use crate::tree::{HashDoc, HashEntry, HashTree};
use crate::types::{
    check_id, split_extension, Document, EntryType, CONTENT_FILE_EXT, METADATA_FILE_EXT,
    PAGE_FILE_EXT,
};
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

pub struct BlobStorage {
    data_dir: PathBuf,
    allowed_extensions: Vec<String>,
    cache: SledTreeCache,
    locks: UserLockManager,
}

impl BlobStorage {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        allowed_extensions: Vec<String>,
        cache: SledTreeCache,
    ) -> Self {
        Self {
            data_dir: data_dir.into(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            cache,
            locks: UserLockManager::new(),
        }
    }

    /// Content store of `uid`
    pub fn blob_store(&self, uid: &str) -> Result<FsBlobStore, ApiError> {
        check_id(uid)?;
        Ok(FsBlobStore::new(
            self.data_dir.join("users").join(uid).join("sync"),
        )?)
    }

    /// The user's tree, reconciled against the published root
    pub fn get_cached_tree(&self, uid: &str) -> Result<HashTree, ApiError> {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        let store = self.blob_store(uid)?;
        self.load_tree(uid, &store)
    }

    fn load_tree(&self, uid: &str, store: &FsBlobStore) -> Result<HashTree, ApiError> {
        let mut tree = match self.cache.get(uid)? {
            Some(tree) => tree,
            None => HashTree::new(),
        };
        let root = match store.root()? {
            Some(root) => root,
            None => return Ok(tree),
        };
        let mut dirty = false;
        if tree.hash != root.hash {
            let stats = tree.mirror(&root.hash, store)?;
            info!(
                uid,
                added = stats.added,
                updated = stats.updated,
                removed = stats.removed,
                "tree refreshed from root"
            );
            if stats.metadata_decode_failures > 0 {
                warn!(uid, failures = stats.metadata_decode_failures, "metadata left stale");
            }
            dirty = true;
        }
        if tree.generation != root.generation {
            tree.generation = root.generation;
            dirty = true;
        }
        if dirty {
            self.cache.put(uid, &tree)?;
        }
        Ok(tree)
    }

    /// Run a mutation under the user's lock and publish the resulting tree
    fn update_tree<T, F>(&self, uid: &str, mutate: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut HashTree, &FsBlobStore) -> Result<T, ApiError>,
    {
        self.update_tree_if(uid, |tree, store| Ok((mutate(tree, store)?, true)))
    }

    /// Like `update_tree`, but nothing is published when the mutation reports no change
    fn update_tree_if<T, F>(&self, uid: &str, mutate: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut HashTree, &FsBlobStore) -> Result<(T, bool), ApiError>,
    {
        let lock = self.locks.get_lock(uid);
        let _guard = lock.write();
        let store = self.blob_store(uid)?;
        let mut tree = self.load_tree(uid, &store)?;

        let (result, changed) = mutate(&mut tree, &store)?;
        if !changed {
            return Ok(result);
        }

        let (hash, _) = store.put_reader(&mut tree.index_reader()?)?;
        if hash != tree.hash {
            return Err(StorageError::Hashing(format!(
                "root index digest {} does not match tree hash {}",
                hash, tree.hash
            ))
            .into());
        }
        tree.generation += 1;
        store.set_root(&RootPointer {
            hash: tree.hash.clone(),
            generation: tree.generation,
        })?;
        self.cache.put(uid, &tree)?;
        debug!(uid, hash = %tree.hash, generation = tree.generation, "root swapped");
        Ok(result)
    }

    #[instrument(skip(self, stream))]
    pub fn create_blob_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError> {
        let (name, ext) = split_extension(filename);
        if !self.allowed_extensions.contains(&ext) {
            return Err(ApiError::UnsupportedExtension(ext));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let metadata = MetadataFile::new(name, parent, EntryType::Document);

        self.update_tree(uid, |tree, store| {
            check_tree_parent(tree, parent)?;
            let mut doc = HashDoc::with_metadata(id.clone(), metadata);
            let (payload_hash, size) = store.put_reader(stream)?;
            doc.add_file(HashEntry::file(format!("{}.{}", id, ext), payload_hash))?;
            let content = serde_json::to_vec_pretty(&content_template(&ext))?;
            doc.add_file(HashEntry::file(
                format!("{}{}", id, CONTENT_FILE_EXT),
                store.put(&content)?,
            ))?;
            doc.add_file(HashEntry::file(
                format!("{}{}", id, PAGE_FILE_EXT),
                store.put(&[])?,
            ))?;
            publish_doc(&mut doc, store)?;
            info!(doc_id = %id, size, "document uploaded");

            let created = to_document(&doc);
            tree.add(doc)?;
            Ok(created)
        })
    }

    #[instrument(skip(self))]
    pub fn create_blob_folder(
        &self,
        uid: &str,
        name: &str,
        parent: &str,
    ) -> Result<Document, ApiError> {
        let id = uuid::Uuid::new_v4().to_string();
        let metadata = MetadataFile::new(name.trim(), parent, EntryType::Collection);

        self.update_tree(uid, |tree, store| {
            check_tree_parent(tree, parent)?;
            let mut doc = HashDoc::with_metadata(id.clone(), metadata);
            let content = serde_json::to_vec(&folder_content())?;
            doc.add_file(HashEntry::file(
                format!("{}{}", id, CONTENT_FILE_EXT),
                store.put(&content)?,
            ))?;
            publish_doc(&mut doc, store)?;
            info!(doc_id = %id, "folder created");

            let created = to_document(&doc);
            tree.add(doc)?;
            Ok(created)
        })
    }

    /// Set name and parent in one step, bumping the version
    pub fn update_blob_document(
        &self,
        uid: &str,
        id: &str,
        name: &str,
        parent: &str,
    ) -> Result<(), ApiError> {
        self.update_tree(uid, |tree, store| {
            check_move(tree, id, parent)?;
            let updated = tree.update_doc(id, |doc| {
                doc.replace_metadata(MetadataFile {
                    document_name: name.to_string(),
                    parent: parent.to_string(),
                    version: doc.metadata.version + 1,
                    last_modified: now_millis_string(),
                    metadata_modified: true,
                    ..doc.metadata.clone()
                });
                publish_doc(doc, store)
            })?;
            updated.ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))
        })
    }

    /// Remove a document, or a folder nothing is parented to
    #[instrument(skip(self))]
    pub fn delete_blob_document(&self, uid: &str, id: &str) -> Result<(), ApiError> {
        self.update_tree(uid, |tree, _store| {
            let doc = tree
                .find_doc(id)
                .ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))?;
            if doc.metadata.is_collection()
                && tree.docs().iter().any(|d| d.metadata.parent == id)
            {
                return Err(ApiError::NonEmptyFolder(id.to_string()));
            }
            if let Some(doc) = tree.remove(id)? {
                info!(doc_id = %id, name = %doc.metadata.document_name, "document deleted");
            }
            Ok(())
        })
    }

    /// Rename a document; returns false when it already has `name`
    #[instrument(skip(self))]
    pub fn rename_blob_document(&self, uid: &str, id: &str, name: &str) -> Result<bool, ApiError> {
        self.update_tree_if(uid, |tree, store| {
            let current = find_metadata(tree, id)?;
            if current.document_name == name {
                return Ok((false, false));
            }
            let renamed = current.renamed(name);
            tree.update_doc(id, |doc| {
                doc.replace_metadata(renamed);
                publish_doc(doc, store)
            })?;
            info!(doc_id = %id, "renamed");
            Ok((true, true))
        })
    }

    /// Move a document under `parent`; returns false when it is already there
    #[instrument(skip(self))]
    pub fn move_blob_document(&self, uid: &str, id: &str, parent: &str) -> Result<bool, ApiError> {
        self.update_tree_if(uid, |tree, store| {
            check_move(tree, id, parent)?;
            let current = find_metadata(tree, id)?;
            if current.parent == parent {
                return Ok((false, false));
            }
            let moved = current.moved(parent);
            tree.update_doc(id, |doc| {
                doc.replace_metadata(moved);
                publish_doc(doc, store)
            })?;
            info!(doc_id = %id, parent, "moved");
            Ok((true, true))
        })
    }

    /// Stream the uploaded payload of a document
    pub fn export(&self, uid: &str, id: &str) -> Result<Box<dyn Read + Send>, ApiError> {
        let tree = self.get_cached_tree(uid)?;
        let doc = tree
            .find_doc(id)
            .ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))?;
        let payload = doc
            .payload_entry()
            .ok_or_else(|| ApiError::DocumentNotFound(format!("{} has no payload", id)))?;
        let store = self.blob_store(uid)?;
        Ok(store.get_reader(&payload.hash)?)
    }

    pub fn get_blob_metadata(&self, uid: &str, id: &str) -> Result<MetadataFile, ApiError> {
        let tree = self.get_cached_tree(uid)?;
        tree.find_doc(id)
            .map(|doc| doc.metadata.clone())
            .ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))
    }

    /// Replace a document's metadata wholesale
    pub fn update_blob_metadata(
        &self,
        uid: &str,
        id: &str,
        metadata: MetadataFile,
    ) -> Result<(), ApiError> {
        self.update_tree(uid, |tree, store| {
            let updated = tree.update_doc(id, |doc| {
                doc.replace_metadata(metadata);
                publish_doc(doc, store)
            })?;
            updated.ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))
        })
    }
}

fn find_metadata(tree: &HashTree, id: &str) -> Result<MetadataFile, ApiError> {
    tree.find_doc(id)
        .map(|doc| doc.metadata.clone())
        .ok_or_else(|| ApiError::DocumentNotFound(id.to_string()))
}

/// Destination must be the root, the trash or a folder in `tree`
fn check_tree_parent(tree: &HashTree, parent: &str) -> Result<(), ApiError> {
    check_parent_with(parent, || find_metadata(tree, parent))
}

/// Destination checks for `id`, including moves under its own descendants
fn check_move(tree: &HashTree, id: &str, parent: &str) -> Result<(), ApiError> {
    check_tree_parent(tree, parent)?;
    check_not_descendant(id, parent, |current| {
        tree.find_doc(current).map(|doc| doc.metadata.parent.clone())
    })
}

/// Upload the metadata and the manifest of `doc`, adding the metadata entry if missing
fn publish_doc(doc: &mut HashDoc, store: &FsBlobStore) -> Result<(), StorageError> {
    let metadata_name = format!("{}{}", doc.id(), METADATA_FILE_EXT);
    if !doc.files().iter().any(|f| f.has_suffix(METADATA_FILE_EXT)) {
        doc.add_file(HashEntry::file(metadata_name, String::new()))?;
    }
    let (_, mut metadata) = doc.metadata_reader()?;
    store.put_reader(&mut metadata)?;

    let (hash, _) = store.put_reader(&mut doc.index_reader()?)?;
    if hash != doc.hash() {
        return Err(StorageError::Hashing(format!(
            "manifest digest {} does not match doc hash {}",
            hash,
            doc.hash()
        )));
    }
    Ok(())
}

fn to_document(doc: &HashDoc) -> Document {
    Document {
        id: doc.id().to_string(),
        doc_type: doc.metadata.collection_type,
        name: doc.metadata.document_name.clone(),
        version: doc.metadata.version,
    }
}
