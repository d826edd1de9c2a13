//! Environment variable source: DOCSYNC_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
///
/// `DOCSYNC_STORAGE__DATA_DIR=/srv/sync` sets `storage.data_dir`;
/// `DOCSYNC_STORAGE__ALLOWED_EXTENSIONS=pdf,epub` is split on commas.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("DOCSYNC")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("storage.allowed_extensions")
            .try_parsing(true),
    );
    Ok(builder)
}
