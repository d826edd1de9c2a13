//! Error types for the document sync core.

use thiserror::Error;

/// Entity, codec and blob-store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Metadata entry not found in document {0}")]
    MetadataEntryNotFound(String),

    #[error("Document {0} has no files")]
    EmptyManifest(String),

    #[error("Invalid index at line {line}: {reason}")]
    IndexFormat { line: usize, reason: String },

    #[error("Hashing failed: {0}")]
    Hashing(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Backend operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unsupported extension: {0}")]
    UnsupportedExtension(String),

    #[error("Parent is not a folder: {0}")]
    InvalidParent(String),

    #[error("Can't remove non-empty folder: {0}")]
    NonEmptyFolder(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::StorageError(StorageError::IoError(err))
    }
}

impl From<zip::result::ZipError> for ApiError {
    fn from(err: zip::result::ZipError) -> Self {
        ApiError::Archive(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::StorageError(StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            err,
        )))
    }
}
