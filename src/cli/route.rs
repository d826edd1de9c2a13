//! CLI route: single route table and run context. Dispatches to the backend and presentation.

use crate::backend::{Backend, DocumentBackend};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_created, format_metadata_json, format_metadata_text, format_tree_json,
    format_tree_text,
};
use crate::config::{ConfigLoader, SyncConfig};
use crate::error::ApiError;
use crate::notify::{ChannelHub, HubMessage};
use crate::types::{check_id, SyncVersion};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Options that shape a run context, usually taken from global CLI flags.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub uid: String,
    pub sync_version: Option<SyncVersion>,
    pub data_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

/// Runtime context for CLI execution: resolved config, the user's backend
/// and the receiving end of its notification hub.
pub struct RunContext {
    uid: String,
    config: SyncConfig,
    backend: Backend,
    notifications: Receiver<HubMessage>,
}

impl RunContext {
    /// Load configuration (file, or layered sources under the data root) and open the backend.
    pub fn new(options: RunOptions) -> Result<Self, ApiError> {
        check_id(&options.uid)?;
        let config = load_config(options.config_path.as_deref(), options.data_dir.as_deref())?;
        Self::with_config(options.uid, config, options.sync_version)
    }

    /// Open the backend for an already resolved configuration.
    pub fn with_config(
        uid: String,
        config: SyncConfig,
        sync_version: Option<SyncVersion>,
    ) -> Result<Self, ApiError> {
        config.validate()?;
        let version = sync_version.unwrap_or(config.storage.default_sync_version);
        fs::create_dir_all(&config.storage.data_dir)?;

        let (hub, notifications) = ChannelHub::new_pair();
        let backend = Backend::open(version, &config.storage, Arc::new(hub))?;
        debug!(uid = %uid, version = %version, data_dir = ?config.storage.data_dir, "backend opened");

        Ok(Self {
            uid,
            config,
            backend,
            notifications,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Notifications raised since the last drain
    pub fn drain_notifications(&self) -> Vec<HubMessage> {
        self.notifications.try_iter().collect()
    }

    /// Log and discard pending notifications
    pub fn flush_notifications(&self) {
        for message in self.drain_notifications() {
            match &message {
                HubMessage::Document {
                    event,
                    notification,
                    device,
                    ..
                } => info!(
                    uid = %message.uid(),
                    event = ?event,
                    doc_id = %notification.id,
                    version = notification.version,
                    device = %device,
                    "document notification"
                ),
                HubMessage::Sync { token, .. } => {
                    info!(uid = %message.uid(), token = %token, "sync notification")
                }
            }
        }
    }

    /// Run one command; mutations are followed by a sync request when something changed.
    #[instrument(skip(self, command), fields(command = command.name(), uid = %self.uid))]
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let (output, changed) = self.execute_inner(command)?;
        if command.is_mutation() && changed {
            self.backend.sync(&self.uid);
        }
        Ok(output)
    }

    fn execute_inner(&self, command: &Commands) -> Result<(String, bool), ApiError> {
        let uid = self.uid.as_str();
        match command {
            Commands::Ls { format, trash } => {
                let tree = self.backend.list_tree(uid)?;
                let output = if format == "json" {
                    format_tree_json(&tree, *trash)?
                } else {
                    format_tree_text(&tree, *trash)
                };
                Ok((output, false))
            }
            Commands::Mkdir { name, parent } => {
                if name.trim().is_empty() {
                    return Err(ApiError::ConfigError(
                        "Folder name cannot be empty".to_string(),
                    ));
                }
                let document = self.backend.create_folder(uid, name, parent)?;
                Ok((format_created(&document, self.backend.version()), true))
            }
            Commands::Upload { path, parent, name } => {
                let filename = match name {
                    Some(name) => name.clone(),
                    None => upload_name(path)?,
                };
                let mut file = fs::File::open(path)?;
                let document = self
                    .backend
                    .create_document(uid, &filename, parent, &mut file)?;
                Ok((format_created(&document, self.backend.version()), true))
            }
            Commands::Rm { id, yes } => {
                if !*yes && !confirm(&format!("Delete '{}'?", id))? {
                    return Ok(("Deletion cancelled".to_string(), false));
                }
                self.backend.delete(uid, id)?;
                Ok((format!("Deleted {}", id), true))
            }
            Commands::Mv { id, parent } => {
                let changed = self.backend.move_document(uid, id, parent)?;
                let target = if parent.is_empty() { "(root)" } else { parent };
                let output = if changed {
                    format!("Moved {} to {}", id, target)
                } else {
                    format!("{} is already in {}", id, target)
                };
                Ok((output, changed))
            }
            Commands::Rename { id, name } => {
                let changed = self.backend.rename(uid, id, name)?;
                let output = if changed {
                    format!("Renamed {} to {:?}", id, name)
                } else {
                    format!("{} is already named {:?}", id, name)
                };
                Ok((output, changed))
            }
            Commands::Export { id, format, output } => {
                let mut reader = self.backend.export(uid, id, format)?;
                let written = write_export(&mut reader, output)?;
                Ok((
                    format!("Exported {} to {} ({} bytes)", id, output.display(), written),
                    false,
                ))
            }
            Commands::Meta { id, format } => {
                let metadata = self.backend.get_metadata(uid, id)?;
                let output = if format == "json" {
                    format_metadata_json(id, &metadata)?
                } else {
                    format_metadata_text(id, &metadata)
                };
                Ok((output, false))
            }
            Commands::Sync => {
                self.backend.sync(uid);
                Ok(("Sync requested".to_string(), false))
            }
        }
    }
}

/// Config from an explicit file, or layered sources rooted at the data dir.
/// An explicit `data_dir` always wins over configured values.
pub fn load_config(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<SyncConfig, ApiError> {
    let mut config = match (config_path, data_dir) {
        (Some(path), _) => ConfigLoader::load_from_file(path)?,
        (None, Some(root)) => ConfigLoader::load(root)?,
        (None, None) => {
            let defaults = ConfigLoader::default();
            ConfigLoader::load(&defaults.storage.data_dir)?
        }
    };
    if let Some(root) = data_dir {
        config.storage.data_dir = root.to_path_buf();
    }
    Ok(config)
}

fn upload_name(path: &Path) -> Result<String, ApiError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ApiError::ConfigError(format!("Not a file name: {}", path.display())))
}

fn confirm(prompt: &str) -> Result<bool, ApiError> {
    use dialoguer::Confirm;
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| ApiError::ConfigError(format!("Failed to get user input: {}", e)))
}

/// Copy an export to `output` via a temp file so a failed read leaves nothing behind
fn write_export(reader: &mut dyn io::Read, output: &Path) -> Result<u64, ApiError> {
    let mut temp_name = output.as_os_str().to_os_string();
    temp_name.push(".part");
    let temp_path = PathBuf::from(temp_name);

    let mut copy = || -> Result<u64, ApiError> {
        let mut file = fs::File::create(&temp_path)?;
        let written = io::copy(reader, &mut file)?;
        file.sync_all()?;
        Ok(written)
    };
    match copy() {
        Ok(written) => {
            fs::rename(&temp_path, output)?;
            Ok(written)
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}
