//! Integration tests for the 1.0 backend over per-document archives

use super::test_utils::{open_backend, storage_config};
use docsync::backend::{DocumentBackend, Entry};
use docsync::error::ApiError;
use docsync::metadata::RawMetadata;
use docsync::notify::{EventType, HubMessage};
use docsync::types::{EntryType, SyncVersion};
use std::fs;
use std::io::{Cursor, Read};
use tempfile::TempDir;

fn upload(backend: &dyn DocumentBackend, name: &str, parent: &str, body: &[u8]) -> String {
    backend
        .create_document("alice", name, parent, &mut Cursor::new(body.to_vec()))
        .unwrap()
        .id
}

/// Uploading writes `<id>.zip` and `<id>.metadata` in the user's directory
#[test]
fn test_upload_layout_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let config = storage_config(temp_dir.path());
    let (backend, _rx) = open_backend(SyncVersion::Sync10, &config);

    let id = upload(&backend, "Paper.pdf", "", b"%PDF-1.5");
    let user_dir = temp_dir.path().join("users").join("alice");

    let archive = zip::ZipArchive::new(fs::File::open(user_dir.join(format!("{}.zip", id))).unwrap())
        .unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            format!("{}.content", id),
            format!("{}.pagedata", id),
            format!("{}.pdf", id)
        ]
    );

    let raw: RawMetadata =
        serde_json::from_slice(&fs::read(user_dir.join(format!("{}.metadata", id))).unwrap())
            .unwrap();
    assert_eq!(raw.visible_name, "Paper");
    assert_eq!(raw.version, 1);
    assert_eq!(raw.doc_type, EntryType::Document);
}

/// Export returns the archive itself or the payload member
#[test]
fn test_export_formats() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, _rx) = open_backend(SyncVersion::Sync10, &storage_config(temp_dir.path()));
    let id = upload(&backend, "Book.epub", "", b"epub bytes");

    let mut payload = Vec::new();
    backend
        .export("alice", &id, "epub")
        .unwrap()
        .read_to_end(&mut payload)
        .unwrap();
    assert_eq!(payload, b"epub bytes");

    let mut zipped = Vec::new();
    backend
        .export("alice", &id, "zip")
        .unwrap()
        .read_to_end(&mut zipped)
        .unwrap();
    assert!(zip::ZipArchive::new(Cursor::new(zipped)).is_ok());

    assert!(matches!(
        backend.export("alice", &id, "docx"),
        Err(ApiError::UnsupportedExtension(_))
    ));
}

#[test]
fn test_disallowed_extension_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, rx) = open_backend(SyncVersion::Sync10, &storage_config(temp_dir.path()));

    let result = backend.create_document("alice", "notes.txt", "", &mut Cursor::new(b"x".to_vec()));
    assert!(matches!(result, Err(ApiError::UnsupportedExtension(_))));
    assert!(backend.list_tree("alice").unwrap().entries.is_empty());
    assert_eq!(rx.try_iter().count(), 0);
}

/// Folder lifecycle: nest, move out, delete once empty
#[test]
fn test_folder_lifecycle_with_notifications() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, rx) = open_backend(SyncVersion::Sync10, &storage_config(temp_dir.path()));

    let folder = backend.create_folder("alice", "Reading", "").unwrap();
    let id = upload(&backend, "Paper.pdf", &folder.id, b"%PDF");

    let tree = backend.list_tree("alice").unwrap();
    match &tree.entries[0] {
        Entry::Directory(dir) => {
            assert_eq!(dir.name, "Reading");
            assert_eq!(dir.entries[0].id(), id);
        }
        other => panic!("expected directory, got {:?}", other),
    }

    assert!(matches!(
        backend.delete("alice", &folder.id),
        Err(ApiError::NonEmptyFolder(_))
    ));
    assert!(backend.move_document("alice", &id, "").unwrap());
    assert_eq!(backend.get_metadata("alice", &id).unwrap().version, 2);
    backend.delete("alice", &folder.id).unwrap();

    let events: Vec<(EventType, String)> = rx
        .try_iter()
        .filter_map(|m| match m {
            HubMessage::Document {
                event,
                notification,
                device,
                ..
            } => {
                assert_eq!(device, "web");
                Some((event, notification.id))
            }
            HubMessage::Sync { .. } => None,
        })
        .collect();
    assert_eq!(
        events,
        vec![
            (EventType::DocumentAdded, folder.id.clone()),
            (EventType::DocumentAdded, id.clone()),
            (EventType::DocumentAdded, id),
            (EventType::DocumentDeleted, folder.id),
        ]
    );
}

#[test]
fn test_move_into_document_refused() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, _rx) = open_backend(SyncVersion::Sync10, &storage_config(temp_dir.path()));
    let a = upload(&backend, "a.pdf", "", b"a");
    let b = upload(&backend, "b.pdf", "", b"b");

    assert!(matches!(
        backend.move_document("alice", &a, &b),
        Err(ApiError::InvalidParent(_))
    ));
    assert!(backend.move_document("alice", &a, "trash").unwrap());
    assert_eq!(backend.list_tree("alice").unwrap().trash.len(), 1);
}

#[test]
fn test_path_like_user_id_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let (backend, _rx) = open_backend(SyncVersion::Sync10, &storage_config(temp_dir.path()));
    assert!(matches!(
        backend.list_tree("../escape"),
        Err(ApiError::InvalidId(_))
    ));
}
