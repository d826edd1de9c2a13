//! Configuration System
//!
//! Layered configuration for the sync core: built-in defaults, the global
//! user file, files under the data root and `DOCSYNC_*` environment
//! variables, merged in that order by [`ConfigLoader`].

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::types::SyncVersion;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

/// Upload extensions accepted when nothing else is configured
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf", "epub"];

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where documents live and what may be uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of all per-user storage (`<data_dir>/users/<uid>`)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Tree cache database; `<data_dir>/cache` when unset
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    /// Lowercase payload extensions without the dot
    #[serde(default = "default_extensions")]
    pub allowed_extensions: Vec<String>,

    #[serde(default)]
    pub default_sync_version: SyncVersion,
}

/// Platform data directory for docsync, or `./docsync-data` when none exists
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "docsync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("docsync-data"))
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_path: None,
            allowed_extensions: default_extensions(),
            default_sync_version: SyncVersion::default(),
        }
    }
}

impl StorageConfig {
    pub fn cache_path(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("cache"))
    }

    /// Allow-list normalized to lowercase without leading dots
    pub fn normalized_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .allowed_extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.data_dir.as_os_str().is_empty() {
            return Err("Data directory cannot be empty".to_string());
        }
        if self.normalized_extensions().is_empty() {
            return Err("At least one upload extension must be allowed".to_string());
        }
        Ok(())
    }
}

impl SyncConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ApiError> {
        self.storage
            .validate()
            .map_err(|e| ApiError::ConfigError(format!("storage: {}", e)))
    }
}
