//! Integration tests for the tab-delimited index format

use docsync::error::StorageError;
use docsync::tree::hasher::compute_hash;
use docsync::tree::index::index_bytes;
use docsync::tree::{parse_index, HashDoc, HashEntry, IndexReader, DOC_TYPE, FILE_TYPE};
use docsync::types::EntryType;
use std::io::Read;

fn hex(seed: &str) -> String {
    compute_hash(seed.as_bytes())
}

/// A listing written by another client parses into the expected entries
#[test]
fn test_parse_client_listing() {
    let text = format!(
        "3\n{}\t0\td1.metadata\t0\t0\n{}\t0\td1.pdf\t0\t0\r\n\n{}\t80000000\td2\t3\t0\n",
        hex("meta"),
        hex("pdf"),
        hex("d2")
    );
    let entries = parse_index(text.as_bytes()).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].entry_name, "d1.metadata");
    assert_eq!(entries[0].entry_type, FILE_TYPE);
    assert_eq!(entries[1].hash, hex("pdf"));
    assert_eq!(entries[2].entry_type, DOC_TYPE);
    assert_eq!(entries[2].subfiles, 3);
}

#[test]
fn test_wrong_schema_version_rejected() {
    let text = format!("4\n{}\t0\ta\t0\t0\n", hex("a"));
    match parse_index(text.as_bytes()) {
        Err(StorageError::IndexFormat { line, .. }) => assert_eq!(line, 1),
        other => panic!("expected IndexFormat, got {:?}", other),
    }
}

#[test]
fn test_malformed_line_reports_line_number() {
    let text = format!("3\n{}\t0\ta\t0\t0\n{}\t0\tb\t0\n", hex("a"), hex("b"));
    match parse_index(text.as_bytes()) {
        Err(StorageError::IndexFormat { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected IndexFormat, got {:?}", other),
    }
}

#[test]
fn test_duplicate_names_rejected() {
    let text = format!("3\n{}\t0\ta\t0\t0\n{}\t0\ta\t0\t0\n", hex("a"), hex("b"));
    assert!(matches!(
        parse_index(text.as_bytes()),
        Err(StorageError::IndexFormat { line: 3, .. })
    ));
}

/// The doc hash is the digest of exactly the bytes its reader streams
#[test]
fn test_doc_hash_addresses_streamed_index() {
    let mut doc = HashDoc::new("Doc", "d1", EntryType::Document);
    doc.add_file(HashEntry::file("d1.pdf", hex("pdf"))).unwrap();
    doc.add_file(HashEntry::file("d1.content", hex("content"))).unwrap();

    let mut streamed = Vec::new();
    doc.index_reader().unwrap().read_to_end(&mut streamed).unwrap();

    assert_eq!(compute_hash(&streamed), doc.hash());
    assert_eq!(streamed, index_bytes(doc.files()).unwrap());
    assert_eq!(parse_index(streamed.as_slice()).unwrap(), doc.files());
}

/// Abandoning a large stream part way does not block
#[test]
fn test_partial_read_then_drop() {
    let entries: Vec<HashEntry> = (0..10_000)
        .map(|i| HashEntry::file(format!("file{:05}", i), hex(&i.to_string())))
        .collect();
    let mut reader = IndexReader::from_entries(&entries).unwrap();
    let mut head = [0u8; 64];
    reader.read_exact(&mut head).unwrap();
    assert_eq!(&head[..2], b"3\n");
    reader.close();
}

#[test]
fn test_names_with_tabs_cannot_be_indexed() {
    let entries = vec![HashEntry::file("bad\tname", hex("x"))];
    assert!(IndexReader::from_entries(&entries).is_err());
}
