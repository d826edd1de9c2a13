//! Document and folder archive builder
//!
//! Archives are assembled under a temporary name and renamed into place only
//! once complete. Any failure removes the temporary file, so `<id>.zip` is
//! either absent or whole.

use crate::error::ApiError;
use crate::metadata::RawMetadata;
use crate::types::{CONTENT_FILE_EXT, METADATA_FILE_EXT, PAGE_FILE_EXT, ZIP_FILE_EXT};
use serde_json::json;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const TEMP_SUFFIX: &str = ".tmp";

/// Content descriptor written for a freshly uploaded document
pub fn content_template(file_type: &str) -> serde_json::Value {
    json!({
        "dummyDocument": false,
        "coverPageNumber": 0,
        "extraMetadata": {
            "LastPen": "Finelinerv2",
            "LastTool": "Finelinerv2",
            "ThicknessScale": "",
            "LastFinelinerv2Size": "1"
        },
        "fileType": file_type.trim_start_matches('.'),
        "fontName": "",
        "lastOpenedPage": 0,
        "lineHeight": -1,
        "margins": 180,
        "orientation": "portrait",
        "pageCount": 0,
        "pages": [],
        "textScale": 1,
        "transform": {
            "m11": 1, "m12": 0, "m13": 0,
            "m21": 0, "m22": 1, "m23": 0,
            "m31": 0, "m32": 0, "m33": 1
        }
    })
}

/// Content descriptor of a folder
pub fn folder_content() -> serde_json::Value {
    json!({ "tags": [] })
}

pub fn archive_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}{}", id, ZIP_FILE_EXT))
}

pub fn metadata_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{}{}", id, METADATA_FILE_EXT))
}

/// Build `<id>.zip` holding the payload, an empty page file and a content descriptor
///
/// `ext` is the payload extension without the dot. Returns the payload size.
#[instrument(skip(dir, payload), fields(doc_id = %id))]
pub fn build_document_archive(
    dir: &Path,
    id: &str,
    ext: &str,
    payload: &mut dyn Read,
) -> Result<u64, ApiError> {
    let content = serde_json::to_vec_pretty(&content_template(ext))?;
    let payload_name = format!("{}.{}", id, ext);
    write_archive(&archive_path(dir, id), |writer, options| {
        writer.start_file(payload_name.as_str(), options)?;
        let size = io::copy(payload, writer)?;
        writer.start_file(format!("{}{}", id, PAGE_FILE_EXT), options)?;
        writer.start_file(format!("{}{}", id, CONTENT_FILE_EXT), options)?;
        writer.write_all(&content)?;
        Ok(size)
    })
}

/// Build `<id>.zip` holding only the folder's tags descriptor
#[instrument(skip(dir), fields(doc_id = %id))]
pub fn build_folder_archive(dir: &Path, id: &str) -> Result<(), ApiError> {
    let content = serde_json::to_vec(&folder_content())?;
    write_archive(&archive_path(dir, id), |writer, options| {
        writer.start_file(format!("{}{}", id, CONTENT_FILE_EXT), options)?;
        writer.write_all(&content)?;
        Ok(())
    })
}

/// Atomically (re)write the metadata record next to an archive
pub fn write_metadata(dir: &Path, metadata: &RawMetadata) -> Result<PathBuf, ApiError> {
    let json = serde_json::to_vec(metadata)?;
    let final_path = metadata_path(dir, &metadata.id);
    let temp_path = temp_path_for(&final_path);
    if let Err(e) = fs::write(&temp_path, &json) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&temp_path, &final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    debug!(doc_id = %metadata.id, version = metadata.version, "metadata written");
    Ok(final_path)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn write_archive<T, F>(final_path: &Path, fill: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut ZipWriter<fs::File>, FileOptions) -> Result<T, ApiError>,
{
    let temp_path = temp_path_for(final_path);
    let build = || -> Result<T, ApiError> {
        let file = fs::File::create(&temp_path)?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let result = fill(&mut writer, options)?;
        writer.finish()?.sync_all()?;
        Ok(result)
    };
    let result = match build() {
        Ok(result) => result,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };
    if let Err(e) = fs::rename(&temp_path, final_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    debug!(path = ?final_path, "archive written");
    Ok(result)
}
