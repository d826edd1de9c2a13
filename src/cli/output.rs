//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, StorageError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::UnsupportedExtension(ext) => format!(
            "error: files with extension {:?} cannot be uploaded",
            ext
        ),
        ApiError::DocumentNotFound(id) => format!("error: no document with id {}", id),
        ApiError::StorageError(StorageError::NotFound(hash)) => {
            format!("error: storage is missing blob {}", hash)
        }
        other => format!("error: {}", other),
    }
}

/// Process exit code for an error
pub fn exit_code(e: &ApiError) -> i32 {
    match e {
        ApiError::ConfigError(_) => 78,
        ApiError::StorageError(_) | ApiError::Archive(_) => 74,
        _ => 1,
    }
}
