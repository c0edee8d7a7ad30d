//! Entry points for loading configuration.

use super::merge;
use super::sources::{env, global_file, workspace_file};
use super::RebuildConfig;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the workspace at `workspace_root`.
    ///
    /// Layers, lowest precedence first: defaults, global file, workspace
    /// `config/config.toml`, workspace `config/{REBUILD_BATCH_ENV}.toml`, then
    /// environment variables.
    pub fn load(workspace_root: &Path) -> Result<RebuildConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = env::add_to_builder(builder);

        let config: RebuildConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration from one explicit file; environment variables still apply.
    pub fn load_from_file(path: &Path) -> Result<RebuildConfig, ConfigError> {
        let builder = merge::builder_with_defaults()?
            .add_source(File::from(path).required(true));
        let builder = env::add_to_builder(builder);
        builder.build()?.try_deserialize()
    }

    /// Path of the user-level config file, whether or not it exists.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
