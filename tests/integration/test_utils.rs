//! Shared fixtures for integration tests

use docsync::backend::Backend;
use docsync::config::StorageConfig;
use docsync::notify::{ChannelHub, HubMessage};
use docsync::store::{BlobStore, MemoryBlobStore};
use docsync::tree::{HashDoc, HashEntry, HashTree};
use docsync::types::{EntryType, SyncVersion};
use std::io::Read;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

pub fn storage_config(data_dir: &Path) -> StorageConfig {
    StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..StorageConfig::default()
    }
}

/// Open a backend wired to a fresh channel hub
pub fn open_backend(
    version: SyncVersion,
    config: &StorageConfig,
) -> (Backend, Receiver<HubMessage>) {
    let (hub, receiver) = ChannelHub::new_pair();
    let backend = Backend::open(version, config, Arc::new(hub)).unwrap();
    (backend, receiver)
}

/// A document with a metadata file and one content file, both stored in `store`
pub fn stored_doc(store: &MemoryBlobStore, id: &str, name: &str, content: &str) -> HashDoc {
    let mut doc = HashDoc::new(name, id, EntryType::Document);
    let content_hash = store.put(content.as_bytes()).unwrap();
    doc.add_file(HashEntry::file(format!("{}.content", id), content_hash))
        .unwrap();
    doc.add_file(HashEntry::file(format!("{}.metadata", id), String::new()))
        .unwrap();
    let (_, mut metadata) = doc.metadata_reader().unwrap();
    let mut bytes = Vec::new();
    metadata.read_to_end(&mut bytes).unwrap();
    store.put(&bytes).unwrap();
    doc
}

/// Upload every manifest and the root index; returns the root hash
pub fn publish(store: &MemoryBlobStore, tree: &HashTree) -> String {
    for doc in tree.docs() {
        let mut index = Vec::new();
        doc.index_reader().unwrap().read_to_end(&mut index).unwrap();
        assert_eq!(store.put(&index).unwrap(), doc.hash());
    }
    let mut root = Vec::new();
    tree.index_reader().unwrap().read_to_end(&mut root).unwrap();
    let hash = store.put(&root).unwrap();
    assert_eq!(hash, tree.hash);
    hash
}
