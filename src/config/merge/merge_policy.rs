//! Merge rules: defaults, override order, conflict handling.

use crate::config::{default_data_dir, DEFAULT_EXTENSIONS};
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default(
            "storage.data_dir",
            default_data_dir().to_string_lossy().into_owned(),
        )?
        .set_default("storage.allowed_extensions", DEFAULT_EXTENSIONS.to_vec())?
        .set_default("storage.default_sync_version", "1.5")?
        .set_default("logging.level", "info")
}
