//! Integration tests for tree reconciliation against a content store

use super::test_utils::{publish, stored_doc};
use docsync::store::{BlobStore, MemoryBlobStore};
use docsync::tree::{HashEntry, HashTree};

fn remote_tree(store: &MemoryBlobStore) -> HashTree {
    let mut tree = HashTree::new();
    tree.add(stored_doc(store, "a", "Alpha", "alpha body")).unwrap();
    tree.add(stored_doc(store, "b", "Beta", "beta body")).unwrap();
    tree
}

/// An empty cache rebuilds the whole tree from the root index
#[test]
fn test_mirror_into_empty_tree() {
    let store = MemoryBlobStore::new();
    let remote = remote_tree(&store);
    let root = publish(&store, &remote);

    let mut local = HashTree::new();
    let stats = local.mirror(&root, &store).unwrap();

    assert_eq!(stats.added, 2);
    assert_eq!(stats.metadata_refreshed, 2);
    assert_eq!(stats.hash_mismatches, 0);
    assert_eq!(local.hash, remote.hash);
    assert_eq!(local.find_doc("a").unwrap().metadata.document_name, "Alpha");
    assert_eq!(local.find_doc("b").unwrap().files(), remote.find_doc("b").unwrap().files());
}

/// Only the changed document is fetched again
#[test]
fn test_incremental_mirror_touches_changed_doc_only() {
    let store = MemoryBlobStore::new();
    let mut remote = remote_tree(&store);
    let root = publish(&store, &remote);

    let mut local = HashTree::new();
    local.mirror(&root, &store).unwrap();
    let untouched_hash = remote.find_doc("a").unwrap().hash().to_string();

    let new_content = store.put(b"beta body v2").unwrap();
    remote
        .update_doc("b", |doc| doc.add_file(HashEntry::file("b.content", new_content)))
        .unwrap();
    let root = publish(&store, &remote);

    let reads_before = store.read_count(&untouched_hash);
    let stats = local.mirror(&root, &store).unwrap();

    assert_eq!(stats.retained, 1);
    assert_eq!(stats.updated, 1);
    assert_eq!(stats.metadata_refreshed, 0);
    assert_eq!(store.read_count(&untouched_hash), reads_before);
    assert_eq!(local.hash, remote.hash);
}

/// Removing a document remotely drops it locally; a repeat mirror is a no-op
#[test]
fn test_mirror_removes_and_settles() {
    let store = MemoryBlobStore::new();
    let mut remote = remote_tree(&store);
    let root = publish(&store, &remote);

    let mut local = HashTree::new();
    local.mirror(&root, &store).unwrap();

    remote.remove("a").unwrap();
    let root = publish(&store, &remote);
    let stats = local.mirror(&root, &store).unwrap();
    assert_eq!(stats.removed, 1);
    assert!(local.find_doc("a").is_none());

    let reads = store.total_reads();
    let again = local.mirror(&root, &store).unwrap();
    assert!(again.is_noop());
    assert_eq!(store.total_reads(), reads);
}

/// A missing manifest blob fails the mirror and leaves the tree as it was
#[test]
fn test_failed_mirror_keeps_previous_tree() {
    let store = MemoryBlobStore::new();
    let remote = remote_tree(&store);
    let root = publish(&store, &remote);

    let mut local = HashTree::new();
    local.mirror(&root, &store).unwrap();
    let before = local.clone();

    // Root index naming a manifest the store does not hold
    let broken = MemoryBlobStore::new();
    let lines = format!("3\n{}\t80000000\tc\t2\t0\n", "ab".repeat(32));
    broken.put_raw("f".repeat(64), lines.into_bytes());

    assert!(local.mirror(&"f".repeat(64), &broken).is_err());
    assert_eq!(local, before);
}
