//! Nested document tree for presentation
//!
//! Built from flat per-document records: each entry is placed under its
//! parent folder. Entries whose parent is unknown, is not a folder, or sits
//! on a parent cycle land at the root. Entries parented to `trash` are listed
//! separately.

use crate::metadata::RawMetadata;
use crate::tree::HashTree;
use crate::types::{DocumentId, EntryType, TRASH_PARENT};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One document or folder before nesting
#[derive(Debug, Clone, PartialEq)]
pub struct FlatDoc {
    pub id: DocumentId,
    pub parent: DocumentId,
    pub name: String,
    pub doc_type: EntryType,
    pub extension: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directory {
    pub id: DocumentId,
    pub name: String,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<DateTime<Utc>>,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    pub id: DocumentId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(rename = "lastModified")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Entry {
    Directory(Directory),
    Document(DocumentEntry),
}

impl Entry {
    pub fn id(&self) -> &str {
        match self {
            Entry::Directory(d) => &d.id,
            Entry::Document(d) => &d.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Directory(d) => &d.name,
            Entry::Document(d) => &d.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentTree {
    pub entries: Vec<Entry>,
    pub trash: Vec<Entry>,
}

impl DocumentTree {
    pub fn from_flat(docs: Vec<FlatDoc>) -> Self {
        let by_id: HashMap<&str, &FlatDoc> = docs.iter().map(|d| (d.id.as_str(), d)).collect();

        let mut children: HashMap<&str, Vec<&FlatDoc>> = HashMap::new();
        let mut roots = Vec::new();
        let mut trashed = Vec::new();
        for doc in &docs {
            if doc.parent == TRASH_PARENT {
                trashed.push(doc);
                continue;
            }
            match by_id.get(doc.parent.as_str()) {
                Some(parent) if parent.doc_type.is_collection() && parent.id != doc.id => {
                    children.entry(parent.id.as_str()).or_default().push(doc)
                }
                _ => roots.push(doc),
            }
        }

        let mut visited = HashSet::new();
        let mut entries = build_entries(&roots, &children, &mut visited);
        let trash = build_entries(&trashed, &children, &mut visited);

        // Whatever was never reached hangs off a parent cycle.
        let stranded: Vec<&FlatDoc> = docs.iter().filter(|d| !visited.contains(d.id.as_str())).collect();
        for doc in stranded {
            if visited.contains(doc.id.as_str()) {
                continue;
            }
            entries.extend(build_entries(&[doc], &children, &mut visited));
        }
        sort_entries(&mut entries);

        Self { entries, trash }
    }

    pub fn from_raw(records: &[RawMetadata]) -> Self {
        Self::from_flat(
            records
                .iter()
                .map(|r| FlatDoc {
                    id: r.id.clone(),
                    parent: r.parent.clone(),
                    name: r.visible_name.clone(),
                    doc_type: r.doc_type,
                    extension: None,
                    last_modified: r.modified_at(),
                })
                .collect(),
        )
    }

    pub fn from_hash_tree(tree: &HashTree) -> Self {
        Self::from_flat(
            tree.docs()
                .iter()
                .map(|doc| FlatDoc {
                    id: doc.id().to_string(),
                    parent: doc.metadata.parent.clone(),
                    name: doc.metadata.document_name.clone(),
                    doc_type: doc.metadata.collection_type,
                    extension: doc.payload_entry().and_then(|e| {
                        e.entry_name.rsplit_once('.').map(|(_, ext)| ext.to_string())
                    }),
                    last_modified: doc
                        .metadata
                        .last_modified
                        .parse::<i64>()
                        .ok()
                        .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
                })
                .collect(),
        )
    }

    /// Depth-first walk yielding each entry with its depth
    pub fn walk(&self) -> Vec<(usize, &Entry)> {
        fn visit<'a>(entries: &'a [Entry], depth: usize, out: &mut Vec<(usize, &'a Entry)>) {
            for entry in entries {
                out.push((depth, entry));
                if let Entry::Directory(dir) = entry {
                    visit(&dir.entries, depth + 1, out);
                }
            }
        }
        let mut out = Vec::new();
        visit(&self.entries, 0, &mut out);
        out
    }
}

fn build_entries<'a>(
    docs: &[&'a FlatDoc],
    children: &HashMap<&str, Vec<&'a FlatDoc>>,
    visited: &mut HashSet<&'a str>,
) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(docs.len());
    for doc in docs {
        if !visited.insert(doc.id.as_str()) {
            continue;
        }
        let entry = if doc.doc_type.is_collection() {
            let kids = children.get(doc.id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let mut nested = build_entries(kids, children, visited);
            sort_entries(&mut nested);
            Entry::Directory(Directory {
                id: doc.id.clone(),
                name: doc.name.clone(),
                last_modified: doc.last_modified,
                entries: nested,
            })
        } else {
            Entry::Document(DocumentEntry {
                id: doc.id.clone(),
                name: doc.name.clone(),
                extension: doc.extension.clone(),
                last_modified: doc.last_modified,
            })
        };
        entries.push(entry);
    }
    entries
}

/// Folders first, then by name
fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| {
        let a_dir = matches!(a, Entry::Directory(_));
        let b_dir = matches!(b, Entry::Directory(_));
        b_dir.cmp(&a_dir).then_with(|| a.name().cmp(b.name()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(id: &str, parent: &str, kind: EntryType) -> FlatDoc {
        FlatDoc {
            id: id.to_string(),
            parent: parent.to_string(),
            name: id.to_uppercase(),
            doc_type: kind,
            extension: None,
            last_modified: None,
        }
    }

    #[test]
    fn test_nesting_by_parent() {
        let tree = DocumentTree::from_flat(vec![
            flat("doc", "dir", EntryType::Document),
            flat("dir", "", EntryType::Collection),
            flat("top", "", EntryType::Document),
        ]);

        assert_eq!(tree.entries.len(), 2);
        match &tree.entries[0] {
            Entry::Directory(dir) => {
                assert_eq!(dir.id, "dir");
                assert_eq!(dir.entries.len(), 1);
                assert_eq!(dir.entries[0].id(), "doc");
            }
            other => panic!("expected directory, got {:?}", other),
        }
        assert_eq!(tree.entries[1].id(), "top");
    }

    #[test]
    fn test_orphans_and_trash() {
        let tree = DocumentTree::from_flat(vec![
            flat("lost", "missing-parent", EntryType::Document),
            flat("gone", TRASH_PARENT, EntryType::Document),
            flat("under-doc", "lost", EntryType::Document),
        ]);

        let ids: Vec<_> = tree.entries.iter().map(Entry::id).collect();
        assert_eq!(ids, vec!["lost", "under-doc"]);
        assert_eq!(tree.trash.len(), 1);
        assert_eq!(tree.trash[0].id(), "gone");
    }

    #[test]
    fn test_parent_cycle_lands_at_root() {
        let tree = DocumentTree::from_flat(vec![
            flat("a", "b", EntryType::Collection),
            flat("b", "a", EntryType::Collection),
        ]);
        let all: Vec<_> = tree.walk().into_iter().map(|(_, e)| e.id().to_string()).collect();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&"a".to_string()));
        assert!(all.contains(&"b".to_string()));
    }

    #[test]
    fn test_walk_reports_depth() {
        let tree = DocumentTree::from_flat(vec![
            flat("dir", "", EntryType::Collection),
            flat("inner", "dir", EntryType::Collection),
            flat("leaf", "inner", EntryType::Document),
        ]);
        let depths: Vec<_> = tree.walk().into_iter().map(|(d, e)| (d, e.id().to_string())).collect();
        assert_eq!(
            depths,
            vec![
                (0, "dir".to_string()),
                (1, "inner".to_string()),
                (2, "leaf".to_string())
            ]
        );
    }
}
