//! Filesystem-backed legacy storage
//!
//! Layout: `{data_dir}/users/{uid}/{id}.zip` and `{id}.metadata`, one pair per
//! document or folder.

use crate::error::ApiError;
use crate::legacy::archive::{self, archive_path, metadata_path};
use crate::metadata::RawMetadata;
use crate::types::{check_id, split_extension, Document, EntryType, METADATA_FILE_EXT, ZIP_FILE_EXT};
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Metadata record access
pub trait MetadataStorer: Send + Sync {
    fn get_metadata(&self, uid: &str, id: &str) -> Result<RawMetadata, ApiError>;
    fn update_metadata(&self, uid: &str, metadata: &RawMetadata) -> Result<(), ApiError>;
}

/// Document lifecycle over archives and their metadata records
pub trait DocumentHandler: MetadataStorer {
    fn create_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError>;
    fn create_folder(&self, uid: &str, name: &str, parent: &str) -> Result<Document, ApiError>;
    fn get_all_metadata(&self, uid: &str) -> Result<Vec<RawMetadata>, ApiError>;
    fn remove_document(&self, uid: &str, id: &str) -> Result<(), ApiError>;

    /// `zip` yields the archive itself; a payload format yields that member
    fn export_document(
        &self,
        uid: &str,
        id: &str,
        format: &str,
    ) -> Result<Box<dyn Read + Send>, ApiError>;
}

pub struct FileSystemStorage {
    data_dir: PathBuf,
    allowed_extensions: Vec<String>,
}

impl FileSystemStorage {
    pub fn new(data_dir: impl Into<PathBuf>, allowed_extensions: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Directory of `uid`, created on first use
    pub fn user_dir(&self, uid: &str) -> Result<PathBuf, ApiError> {
        check_id(uid)?;
        let dir = self.data_dir.join("users").join(uid);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Split `filename` into display name and allowed extension
    pub fn split_filename<'a>(&self, filename: &'a str) -> Result<(&'a str, String), ApiError> {
        let (name, ext) = split_extension(filename);
        if !self.allowed_extensions.contains(&ext) {
            return Err(ApiError::UnsupportedExtension(ext));
        }
        Ok((name, ext))
    }

    fn read_metadata_file(path: &Path) -> Result<RawMetadata, ApiError> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl MetadataStorer for FileSystemStorage {
    fn get_metadata(&self, uid: &str, id: &str) -> Result<RawMetadata, ApiError> {
        check_id(id)?;
        let path = metadata_path(&self.user_dir(uid)?, id);
        match Self::read_metadata_file(&path) {
            Err(ApiError::StorageError(crate::error::StorageError::IoError(e)))
                if e.kind() == io::ErrorKind::NotFound =>
            {
                Err(ApiError::DocumentNotFound(id.to_string()))
            }
            other => other,
        }
    }

    fn update_metadata(&self, uid: &str, metadata: &RawMetadata) -> Result<(), ApiError> {
        check_id(&metadata.id)?;
        let dir = self.user_dir(uid)?;
        if !metadata_path(&dir, &metadata.id).exists() {
            return Err(ApiError::DocumentNotFound(metadata.id.clone()));
        }
        archive::write_metadata(&dir, metadata)?;
        Ok(())
    }
}

impl DocumentHandler for FileSystemStorage {
    fn create_document(
        &self,
        uid: &str,
        filename: &str,
        parent: &str,
        stream: &mut dyn Read,
    ) -> Result<Document, ApiError> {
        let (name, ext) = self.split_filename(filename)?;
        let dir = self.user_dir(uid)?;
        let id = uuid::Uuid::new_v4().to_string();

        let size = archive::build_document_archive(&dir, &id, &ext, stream)?;
        let raw = RawMetadata::new(id.clone(), name, parent, EntryType::Document);
        if let Err(e) = archive::write_metadata(&dir, &raw) {
            let _ = fs::remove_file(archive_path(&dir, &id));
            return Err(e);
        }

        info!(uid, doc_id = %id, size, "document created");
        Ok(Document {
            id,
            doc_type: raw.doc_type,
            name: raw.visible_name,
            version: raw.version,
        })
    }

    fn create_folder(&self, uid: &str, name: &str, parent: &str) -> Result<Document, ApiError> {
        let dir = self.user_dir(uid)?;
        let id = uuid::Uuid::new_v4().to_string();

        archive::build_folder_archive(&dir, &id)?;
        let raw = RawMetadata::new(id.clone(), name.trim(), parent, EntryType::Collection);
        if let Err(e) = archive::write_metadata(&dir, &raw) {
            let _ = fs::remove_file(archive_path(&dir, &id));
            return Err(e);
        }

        info!(uid, doc_id = %id, "folder created");
        Ok(Document {
            id,
            doc_type: raw.doc_type,
            name: raw.visible_name,
            version: raw.version,
        })
    }

    fn get_all_metadata(&self, uid: &str) -> Result<Vec<RawMetadata>, ApiError> {
        let dir = self.user_dir(uid)?;
        let mut records = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                io::Error::new(io::ErrorKind::Other, format!("Failed to list {:?}: {}", dir, e))
            })?;
            let path = entry.path();
            let is_metadata = entry.file_type().is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.ends_with(METADATA_FILE_EXT));
            if !is_metadata {
                continue;
            }
            match Self::read_metadata_file(path) {
                Ok(raw) => records.push(raw),
                Err(e) => warn!(path = ?path, error = %e, "skipping unreadable metadata"),
            }
        }
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    fn remove_document(&self, uid: &str, id: &str) -> Result<(), ApiError> {
        check_id(id)?;
        let dir = self.user_dir(uid)?;
        let meta = metadata_path(&dir, id);
        if !meta.exists() {
            return Err(ApiError::DocumentNotFound(id.to_string()));
        }
        match fs::remove_file(archive_path(&dir, id)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(uid, doc_id = %id, "archive already missing")
            }
            Err(e) => return Err(e.into()),
        }
        fs::remove_file(meta)?;
        info!(uid, doc_id = %id, "document removed");
        Ok(())
    }

    fn export_document(
        &self,
        uid: &str,
        id: &str,
        format: &str,
    ) -> Result<Box<dyn Read + Send>, ApiError> {
        check_id(id)?;
        let path = archive_path(&self.user_dir(uid)?, id);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ApiError::DocumentNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let format = format.trim_start_matches('.').to_ascii_lowercase();
        if format == ZIP_FILE_EXT.trim_start_matches('.') {
            return Ok(Box::new(io::BufReader::new(file)));
        }
        if !self.allowed_extensions.contains(&format) {
            return Err(ApiError::UnsupportedExtension(format));
        }

        let mut zip = zip::ZipArchive::new(file)?;
        let member = format!("{}.{}", id, format);
        let mut entry = match zip.by_name(&member) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(ApiError::DocumentNotFound(member))
            }
            Err(e) => return Err(e.into()),
        };
        let mut payload = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut payload)?;
        Ok(Box::new(Cursor::new(payload)))
    }
}
