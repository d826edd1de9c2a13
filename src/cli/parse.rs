//! CLI parse: clap types for docsync. No behavior; definitions only.

use crate::types::SyncVersion;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docsync - administer a document sync store
#[derive(Parser)]
#[command(name = "docsync")]
#[command(about = "Inspect and modify the documents a user syncs to their tablet")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// User whose documents to operate on
    #[arg(long, default_value = "default")]
    pub uid: String,

    /// Sync protocol backend (1.0 or 1.5); defaults to the configured version
    #[arg(long)]
    pub sync_version: Option<SyncVersion>,

    /// Data root (overrides storage.data_dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the user's folders and documents
    Ls {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Include trashed entries
        #[arg(long)]
        trash: bool,
    },
    /// Create a folder
    Mkdir {
        name: String,
        /// Parent folder id (root when omitted)
        #[arg(long, default_value = "")]
        parent: String,
    },
    /// Upload a document
    Upload {
        path: PathBuf,
        /// Parent folder id (root when omitted)
        #[arg(long, default_value = "")]
        parent: String,
        /// File name to record instead of the local one
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a document or an empty folder
    Rm {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Move an entry into another folder ("" for the root, "trash" to trash it)
    Mv { id: String, parent: String },
    /// Rename an entry
    Rename { id: String, name: String },
    /// Export a document
    Export {
        id: String,
        /// Export format: the payload extension, or zip (1.0 only)
        #[arg(long, default_value = "pdf")]
        format: String,
        /// Destination file
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Show an entry's metadata
    Meta {
        id: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Ask the user's devices to sync
    Sync,
}

impl Commands {
    /// Command name for logging (e.g. "ls", "upload").
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Ls { .. } => "ls",
            Commands::Mkdir { .. } => "mkdir",
            Commands::Upload { .. } => "upload",
            Commands::Rm { .. } => "rm",
            Commands::Mv { .. } => "mv",
            Commands::Rename { .. } => "rename",
            Commands::Export { .. } => "export",
            Commands::Meta { .. } => "meta",
            Commands::Sync => "sync",
        }
    }

    /// Whether the command changes the user's documents
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Commands::Mkdir { .. }
                | Commands::Upload { .. }
                | Commands::Rm { .. }
                | Commands::Mv { .. }
                | Commands::Rename { .. }
        )
    }
}
