//! Merge rules: defaults first, every later source overrides earlier ones.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with the built-in defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("coordinator.batch_warning_threshold", 1000_i64)?
        .set_default("coordinator.journal_enabled", true)?
        .set_default("storage.state_path", ".rebuild/state")?
        .set_default("storage.journal_path", ".rebuild/journal")
}
