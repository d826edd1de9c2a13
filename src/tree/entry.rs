//! Manifest entries and their index line form

use crate::error::StorageError;
use crate::types::Hash;
use serde::{Deserialize, Serialize};

/// Field separator of an index line
pub const DELIMITER: char = '\t';

/// Type tag of a plain file entry
pub const FILE_TYPE: &str = "0";

/// Type tag of an entry that is itself a manifest (a document in the root index)
pub const DOC_TYPE: &str = "80000000";

const INDEX_FIELDS: usize = 5;

/// One file (or sub-manifest) record: a name and the content address of its blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEntry {
    pub entry_name: String,
    pub hash: Hash,
    #[serde(default = "default_entry_type")]
    pub entry_type: String,
    /// Number of constituent files when the entry is a sub-manifest, else 0
    #[serde(default)]
    pub subfiles: usize,
}

fn default_entry_type() -> String {
    FILE_TYPE.to_string()
}

impl HashEntry {
    /// A plain file entry
    pub fn file(name: impl Into<String>, hash: impl Into<Hash>) -> Self {
        Self {
            entry_name: name.into(),
            hash: hash.into(),
            entry_type: FILE_TYPE.to_string(),
            subfiles: 0,
        }
    }

    /// An entry referencing a document manifest
    pub fn doc(name: impl Into<String>, hash: impl Into<Hash>, subfiles: usize) -> Self {
        Self {
            entry_name: name.into(),
            hash: hash.into(),
            entry_type: DOC_TYPE.to_string(),
            subfiles,
        }
    }

    /// Render as `hash \t type \t name \t subfiles \t 0`
    ///
    /// Fails when a field would break the line framing.
    pub fn line(&self) -> Result<String, StorageError> {
        for (field, value) in [("name", &self.entry_name), ("hash", &self.hash)] {
            if value.contains(DELIMITER) || value.contains('\n') || value.contains('\r') {
                return Err(StorageError::Hashing(format!(
                    "entry {} contains a delimiter: {:?}",
                    field, value
                )));
            }
        }
        if self.hash.is_empty() {
            tracing::warn!(entry = %self.entry_name, "missing hash for entry");
        }

        let mut line = String::with_capacity(self.hash.len() + self.entry_name.len() + 16);
        line.push_str(&self.hash);
        line.push(DELIMITER);
        line.push_str(&self.entry_type);
        line.push(DELIMITER);
        line.push_str(&self.entry_name);
        line.push(DELIMITER);
        line.push_str(&self.subfiles.to_string());
        line.push(DELIMITER);
        line.push('0');
        Ok(line)
    }

    /// Parse one index line; `line_no` is only used for error reporting
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, StorageError> {
        let fields: Vec<&str> = line.split(DELIMITER).collect();
        if fields.len() != INDEX_FIELDS {
            return Err(StorageError::IndexFormat {
                line: line_no,
                reason: format!("expected {} fields, got {}", INDEX_FIELDS, fields.len()),
            });
        }

        let hash = fields[0];
        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::IndexFormat {
                line: line_no,
                reason: format!("invalid hash {:?}", hash),
            });
        }
        let name = fields[2];
        if name.is_empty() {
            return Err(StorageError::IndexFormat {
                line: line_no,
                reason: "empty entry name".to_string(),
            });
        }
        let subfiles = fields[3].parse::<usize>().map_err(|e| StorageError::IndexFormat {
            line: line_no,
            reason: format!("invalid file count {:?}: {}", fields[3], e),
        })?;

        Ok(Self {
            entry_name: name.to_string(),
            hash: hash.to_lowercase(),
            entry_type: fields[1].to_string(),
            subfiles,
        })
    }

    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.entry_name.ends_with(suffix)
    }
}
