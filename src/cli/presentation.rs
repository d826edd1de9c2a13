//! CLI presentation: tables and headings for command results.

use crate::backend::{DocumentTree, Entry};
use crate::error::ApiError;
use crate::metadata::MetadataFile;
use crate::types::{Document, SyncVersion};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn format_entries(table: &mut Table, entries: &[Entry]) {
    let mut stack: Vec<(usize, &Entry)> = entries.iter().rev().map(|e| (0, e)).collect();
    while let Some((depth, entry)) = stack.pop() {
        let indent = "  ".repeat(depth);
        match entry {
            Entry::Directory(dir) => {
                table.add_row(vec![
                    format!("{}{}/", indent, dir.name),
                    "folder".to_string(),
                    dir.id.clone(),
                    format_time(dir.last_modified),
                ]);
                stack.extend(dir.entries.iter().rev().map(|e| (depth + 1, e)));
            }
            Entry::Document(doc) => {
                table.add_row(vec![
                    format!("{}{}", indent, doc.name),
                    doc.extension.clone().unwrap_or_else(|| "-".to_string()),
                    doc.id.clone(),
                    format_time(doc.last_modified),
                ]);
            }
        }
    }
}

fn format_time(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn entries_table(entries: &[Entry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Kind", "ID", "Modified"]);
    format_entries(&mut table, entries);
    table
}

/// Format a user's tree as an indented table, trash last when requested.
pub fn format_tree_text(tree: &DocumentTree, include_trash: bool) -> String {
    let mut out = String::new();
    if tree.entries.is_empty() {
        out.push_str("No documents.\n");
    } else {
        out.push_str(&format!("{}\n", entries_table(&tree.entries)));
    }
    if include_trash {
        out.push_str(&format!("\n{}\n\n", format_section_heading("Trash")));
        if tree.trash.is_empty() {
            out.push_str("Trash is empty.\n");
        } else {
            out.push_str(&format!("{}\n", entries_table(&tree.trash)));
        }
    }
    out
}

pub fn format_tree_json(tree: &DocumentTree, include_trash: bool) -> Result<String, ApiError> {
    let value = if include_trash {
        serde_json::to_value(tree)?
    } else {
        serde_json::to_value(&tree.entries)?
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn format_metadata_text(id: &str, metadata: &MetadataFile) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    let parent = if metadata.parent.is_empty() {
        "(root)".to_string()
    } else {
        metadata.parent.clone()
    };
    table.add_row(vec!["ID".to_string(), id.to_string()]);
    table.add_row(vec!["Name".to_string(), metadata.document_name.clone()]);
    table.add_row(vec![
        "Type".to_string(),
        metadata.collection_type.to_string(),
    ]);
    table.add_row(vec!["Parent".to_string(), parent]);
    table.add_row(vec!["Version".to_string(), metadata.version.to_string()]);
    table.add_row(vec![
        "Last modified".to_string(),
        metadata.last_modified.clone(),
    ]);
    table.add_row(vec!["Deleted".to_string(), metadata.deleted.to_string()]);
    format!("{}\n{}", format_section_heading("Metadata"), table)
}

pub fn format_metadata_json(id: &str, metadata: &MetadataFile) -> Result<String, ApiError> {
    let mut value = serde_json::to_value(metadata)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("id".to_string(), serde_json::Value::String(id.to_string()));
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn format_created(document: &Document, version: SyncVersion) -> String {
    format!(
        "Created {} {:?} ({}) via sync {}",
        if document.doc_type.is_collection() {
            "folder"
        } else {
            "document"
        },
        document.name,
        document.id,
        version
    )
}
