//! CLI route: single route table and run context.

use crate::cli::parse::Commands;
use crate::cli::replay::{replay_steps, ReplaySummary};
use crate::config::{ConfigLoader, RebuildConfig, ValidationError};
use crate::coordinator::{BatchJournal, Coordinator};
use crate::store::persistence::SledStatePersistence;
use crate::store::DataStore;
use anyhow::{bail, Context};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Runtime context for CLI execution: workspace root and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: RebuildConfig,
}

impl RunContext {
    /// Load and validate configuration for `workspace_root`, or from `config_path` when given.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ConfigLoader::load(&workspace_root).context("loading workspace config")?,
        };

        if let Err(errors) = config.validate() {
            let messages: Vec<String> = errors.iter().map(ValidationError::to_string).collect();
            bail!("invalid configuration: {}", messages.join("; "));
        }

        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &RebuildConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Replay { file, persist } => self.handle_replay(file, *persist),
            Commands::Config => {
                toml::to_string_pretty(&self.config).context("rendering configuration")
            }
        }
    }

    fn handle_replay(&self, file: &Path, persist: bool) -> anyhow::Result<String> {
        let input = File::open(file)
            .with_context(|| format!("opening event log {}", file.display()))?;

        let mut coordinator = Coordinator::new(self.config.coordinator.clone());
        let mut persistence = None;
        let store = if persist {
            let state_dir = self.config.storage.state_dir(&self.workspace_root);
            let journal_dir = self.config.storage.journal_dir(&self.workspace_root);
            std::fs::create_dir_all(&state_dir)
                .with_context(|| format!("creating {}", state_dir.display()))?;

            let sled_state = Arc::new(SledStatePersistence::new(&state_dir)?);
            let store = Arc::new(DataStore::from_state(sled_state.load_state()?));
            coordinator = coordinator
                .with_journal(BatchJournal::open(&journal_dir)?)
                .with_persister(sled_state.clone());
            persistence = Some(sled_state);
            store
        } else {
            Arc::new(DataStore::new())
        };

        let recovered = coordinator.recover()?;
        let (steps, flushes) = replay_steps(BufReader::new(input), &mut coordinator, &store)?;

        if let Some(ref sled_state) = persistence {
            sled_state.save_state(&store.snapshot())?;
            info!(nodes = store.node_count(), pages = store.page_count(), "Saved store state");
        }

        let summary = ReplaySummary {
            steps,
            recovered,
            flushes,
            persisted: persistence.is_some(),
            ..ReplaySummary::capture(&coordinator, &store)
        };
        serde_json::to_string_pretty(&summary).context("rendering replay summary")
    }
}
