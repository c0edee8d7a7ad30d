//! Configuration System
//!
//! Layered configuration for the coordinator, its storage locations and logging.
//! Sources are merged in order: built-in defaults, the global config file, the
//! workspace config files, then `REBUILD_BATCH_*` environment variables.

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebuildConfig {
    /// Batching behaviour
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Storage paths
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Queue length at which a single warning is logged until the next flush
    #[serde(default = "default_batch_warning_threshold")]
    pub batch_warning_threshold: usize,

    /// Journal each flush so an interrupted one can be recovered
    #[serde(default = "default_true")]
    pub journal_enabled: bool,
}

fn default_batch_warning_threshold() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            batch_warning_threshold: default_batch_warning_threshold(),
            journal_enabled: default_true(),
        }
    }
}

/// Storage locations, relative paths resolve against the workspace root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".rebuild/state")
}

fn default_journal_path() -> PathBuf {
    PathBuf::from(".rebuild/journal")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            journal_path: default_journal_path(),
        }
    }
}

impl StorageConfig {
    pub fn state_dir(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.state_path)
    }

    pub fn journal_dir(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.journal_path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Coordinator(String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Coordinator(msg) => write!(f, "Coordinator: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RebuildConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.coordinator.batch_warning_threshold == 0 {
            errors.push(ValidationError::Coordinator(
                "batch_warning_threshold must be greater than zero".to_string(),
            ));
        }

        if self.storage.state_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "state_path cannot be empty".to_string(),
            ));
        }
        if self.storage.journal_path.as_os_str().is_empty() {
            errors.push(ValidationError::Storage(
                "journal_path cannot be empty".to_string(),
            ));
        }
        if !self.storage.journal_path.as_os_str().is_empty()
            && self.storage.journal_path == self.storage.state_path
        {
            errors.push(ValidationError::Storage(
                "journal_path and state_path must differ".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
