//! Integration tests for layered configuration

use docsync::cli::{load_config, RunContext, RunOptions};
use docsync::config::ConfigLoader;
use docsync::types::SyncVersion;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Points HOME at a scratch directory and clears docsync variables for the test's duration
struct ScratchEnv {
    saved: Vec<(&'static str, Option<String>)>,
}

const VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "DOCSYNC_ENV",
    "DOCSYNC_STORAGE__DATA_DIR",
    "DOCSYNC_STORAGE__ALLOWED_EXTENSIONS",
    "DOCSYNC_STORAGE__DEFAULT_SYNC_VERSION",
];

impl ScratchEnv {
    fn new(home: &std::path::Path) -> Self {
        let saved = VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();
        for key in VARS {
            std::env::remove_var(key);
        }
        fs::create_dir_all(home).unwrap();
        std::env::set_var("HOME", home);
        Self { saved }
    }
}

impl Drop for ScratchEnv {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

/// `config/{DOCSYNC_ENV}.toml` overrides `config/config.toml` under the data root
#[test]
fn test_environment_specific_file_wins() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let _env = ScratchEnv::new(&temp_dir.path().join("home"));

    let root = temp_dir.path().join("data");
    fs::create_dir_all(root.join("config")).unwrap();
    fs::write(
        root.join("config").join("config.toml"),
        "[storage]\nallowed_extensions = [\"pdf\"]\ndefault_sync_version = \"1.0\"\n",
    )
    .unwrap();
    fs::write(
        root.join("config").join("staging.toml"),
        "[storage]\ndefault_sync_version = \"1.5\"\n",
    )
    .unwrap();
    std::env::set_var("DOCSYNC_ENV", "staging");

    let config = ConfigLoader::load(&root).unwrap();
    assert_eq!(config.storage.allowed_extensions, vec!["pdf"]);
    assert_eq!(config.storage.default_sync_version, SyncVersion::Sync15);
}

/// The data dir flag overrides the configured one and picks the default backend
#[test]
fn test_run_context_uses_configured_version() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let _env = ScratchEnv::new(&temp_dir.path().join("home"));

    let root = temp_dir.path().join("data");
    fs::create_dir_all(root.join("config")).unwrap();
    fs::write(
        root.join("config").join("config.toml"),
        "[storage]\ndefault_sync_version = \"1.0\"\n",
    )
    .unwrap();

    let config = load_config(None, Some(&root)).unwrap();
    assert_eq!(config.storage.data_dir, root);

    let ctx = RunContext::new(RunOptions {
        uid: "alice".to_string(),
        sync_version: None,
        data_dir: Some(root.clone()),
        config_path: None,
    })
    .unwrap();
    assert_eq!(
        docsync::backend::DocumentBackend::list_tree(ctx.backend(), "alice")
            .unwrap()
            .entries
            .len(),
        0
    );
    assert_eq!(ctx.backend().version(), SyncVersion::Sync10);
}

#[test]
fn test_invalid_uid_rejected_before_opening_storage() {
    let temp_dir = TempDir::new().unwrap();
    let result = RunContext::new(RunOptions {
        uid: "../bob".to_string(),
        sync_version: Some(SyncVersion::Sync15),
        data_dir: Some(temp_dir.path().to_path_buf()),
        config_path: None,
    });
    assert!(result.is_err());
    assert!(!temp_dir.path().join("cache").exists());
}
