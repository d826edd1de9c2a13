//! Integration tests for the 1.5 backend over the content-addressed tree

use super::test_utils::{open_backend, storage_config};
use docsync::backend::{Backend, DocumentBackend, Entry};
use docsync::error::ApiError;
use docsync::notify::HubMessage;
use docsync::store::{BlobStore, RootPointer};
use docsync::types::SyncVersion;
use std::io::{Cursor, Read};
use tempfile::TempDir;

fn blobs_of(backend: &Backend) -> &docsync::blob::BlobStorage {
    match backend {
        Backend::V15(inner) => inner.blobs(),
        Backend::V10(_) => panic!("expected a 1.5 backend"),
    }
}

fn root_of(backend: &Backend) -> RootPointer {
    blobs_of(backend)
        .blob_store("alice")
        .unwrap()
        .root()
        .unwrap()
        .unwrap()
}

/// Every mutation publishes a new root with a higher generation
#[test]
fn test_mutations_publish_new_roots() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, rx) = open_backend(SyncVersion::Sync15, &storage_config(temp_dir.path()));

    let folder = backend.create_folder("alice", "Papers", "").unwrap();
    let first = root_of(&backend);
    let doc = backend
        .create_document("alice", "Draft.PDF", &folder.id, &mut Cursor::new(b"%PDF".to_vec()))
        .unwrap();
    let second = root_of(&backend);

    assert_eq!(first.generation, 1);
    assert_eq!(second.generation, 2);
    assert_ne!(first.hash, second.hash);
    assert_eq!(doc.name, "Draft");

    let tree = backend.list_tree("alice").unwrap();
    match &tree.entries[0] {
        Entry::Directory(dir) => {
            assert_eq!(dir.entries.len(), 1);
            match &dir.entries[0] {
                Entry::Document(entry) => {
                    assert_eq!(entry.name, "Draft");
                    assert_eq!(entry.extension.as_deref(), Some("pdf"));
                }
                other => panic!("expected document, got {:?}", other),
            }
        }
        other => panic!("expected directory, got {:?}", other),
    }

    // Mutations alone do not notify; callers request a sync
    assert_eq!(rx.try_iter().count(), 0);
    backend.sync("alice");
    let messages: Vec<HubMessage> = rx.try_iter().collect();
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        HubMessage::Sync { uid, token, .. } => {
            assert_eq!(uid, "alice");
            assert!(!token.is_empty());
        }
        other => panic!("expected sync, got {:?}", other),
    }
}

/// A second service instance with its own cache sees the same documents
/// and picks up changes made by the first one
#[test]
fn test_replicas_converge_through_root() {
    let temp_dir = TempDir::new().unwrap();
    let config_a = storage_config(temp_dir.path());
    let mut config_b = storage_config(temp_dir.path());
    config_b.cache_path = Some(temp_dir.path().join("cache-b"));

    let (replica_a, _rx_a) = open_backend(SyncVersion::Sync15, &config_a);
    let doc = replica_a
        .create_document("alice", "Notes.epub", "", &mut Cursor::new(b"epub".to_vec()))
        .unwrap();

    let (replica_b, _rx_b) = open_backend(SyncVersion::Sync15, &config_b);
    assert_eq!(replica_b.list_tree("alice").unwrap().entries.len(), 1);
    assert!(replica_b.rename("alice", &doc.id, "Field notes").unwrap());

    let metadata = replica_a.get_metadata("alice", &doc.id).unwrap();
    assert_eq!(metadata.document_name, "Field notes");
    assert_eq!(metadata.version, 2);

    let tree_a = blobs_of(&replica_a).get_cached_tree("alice").unwrap();
    let tree_b = blobs_of(&replica_b).get_cached_tree("alice").unwrap();
    assert_eq!(tree_a, tree_b);
}

#[test]
fn test_export_ignores_requested_format() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, _rx) = open_backend(SyncVersion::Sync15, &storage_config(temp_dir.path()));
    let doc = backend
        .create_document("alice", "Book.epub", "", &mut Cursor::new(b"chapter one".to_vec()))
        .unwrap();

    let mut out = Vec::new();
    backend
        .export("alice", &doc.id, "zip")
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    assert_eq!(out, b"chapter one");
}

#[test]
fn test_delete_rules() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, _rx) = open_backend(SyncVersion::Sync15, &storage_config(temp_dir.path()));
    let folder = backend.create_folder("alice", "Box", "").unwrap();
    let doc = backend
        .create_document("alice", "a.pdf", &folder.id, &mut Cursor::new(b"a".to_vec()))
        .unwrap();

    assert!(matches!(
        backend.delete("alice", &folder.id),
        Err(ApiError::NonEmptyFolder(_))
    ));
    backend.delete("alice", &doc.id).unwrap();
    backend.delete("alice", &folder.id).unwrap();
    assert!(backend.list_tree("alice").unwrap().entries.is_empty());
    assert!(matches!(
        backend.delete("alice", &doc.id),
        Err(ApiError::DocumentNotFound(_))
    ));
}

#[test]
fn test_parent_must_be_folder() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, _rx) = open_backend(SyncVersion::Sync15, &storage_config(temp_dir.path()));
    let doc = backend
        .create_document("alice", "a.pdf", "", &mut Cursor::new(b"a".to_vec()))
        .unwrap();

    assert!(matches!(
        backend.create_folder("alice", "Inner", &doc.id),
        Err(ApiError::InvalidParent(_))
    ));
    assert!(matches!(
        backend.move_document("alice", &doc.id, "missing-folder"),
        Err(ApiError::InvalidParent(_))
    ));
}
