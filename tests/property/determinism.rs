//! Property-based tests for determinism guarantees

use docsync::tree::hasher::{compute_hash, hash_entries};
use docsync::tree::index::index_bytes;
use docsync::tree::{parse_index, HashDoc, HashEntry, HashTree};
use docsync::types::EntryType;
use proptest::prelude::*;
use std::collections::BTreeMap;

/// File names: no delimiters, unique per listing
fn listing() -> impl Strategy<Value = BTreeMap<String, Vec<u8>>> {
    prop::collection::btree_map("[a-z0-9]{1,12}\\.(pdf|content|metadata|pagedata)", any::<Vec<u8>>(), 1..12)
}

fn entries_of(files: &BTreeMap<String, Vec<u8>>) -> Vec<HashEntry> {
    files
        .iter()
        .map(|(name, body)| HashEntry::file(name.clone(), compute_hash(body)))
        .collect()
}

proptest! {
    /// The manifest hash does not depend on the order files were added
    #[test]
    fn doc_hash_ignores_insertion_order(files in listing(), seed in any::<u64>()) {
        let entries = entries_of(&files);
        let mut shuffled = entries.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        let mut a = HashDoc::new("Doc", "d", EntryType::Document);
        for entry in entries {
            a.add_file(entry).unwrap();
        }
        let mut b = HashDoc::new("Doc", "d", EntryType::Document);
        for entry in shuffled {
            b.add_file(entry).unwrap();
        }

        prop_assert_eq!(a.hash(), b.hash());
        prop_assert_eq!(a.files(), b.files());
    }

    /// Parsing serialized index bytes gives back the same entries
    #[test]
    fn index_round_trip(files in listing()) {
        let entries = entries_of(&files);
        let bytes = index_bytes(&entries).unwrap();
        prop_assert_eq!(parse_index(bytes.as_slice()).unwrap(), entries.clone());
        prop_assert_eq!(compute_hash(&bytes), hash_entries(&entries).unwrap());
    }

    /// The tree hash depends on document content, not on the order documents were added
    #[test]
    fn tree_hash_ignores_insertion_order(ids in prop::collection::btree_set("[a-f0-9]{8}", 1..10)) {
        let docs: Vec<HashDoc> = ids
            .iter()
            .map(|id| {
                let mut doc = HashDoc::new(id.clone(), id.clone(), EntryType::Document);
                doc.add_file(HashEntry::file(format!("{}.content", id), compute_hash(id.as_bytes())))
                    .unwrap();
                doc
            })
            .collect();

        let mut forward = HashTree::new();
        for doc in docs.iter().cloned() {
            forward.add(doc).unwrap();
        }
        let mut backward = HashTree::new();
        for doc in docs.into_iter().rev() {
            backward.add(doc).unwrap();
        }
        prop_assert_eq!(forward.hash, backward.hash);
    }
}

/// Different bytes give different digests (with overwhelming probability)
#[test]
fn test_content_hash_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<Vec<u8>>(), any::<Vec<u8>>()), |(content1, content2)| {
            let hash1 = compute_hash(&content1);
            let hash2 = compute_hash(&content2);
            prop_assert_eq!(hash1.len(), 64);
            if content1 == content2 {
                prop_assert_eq!(hash1, hash2);
            } else {
                prop_assert_ne!(hash1, hash2);
            }
            Ok(())
        })
        .unwrap();
}
