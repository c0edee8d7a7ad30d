//! CLI parse: clap types for rebuild-batch. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rebuild-batch - replay coordinator event logs against a data store
#[derive(Parser)]
#[command(name = "rebuild-batch")]
#[command(about = "Batch store mutations and page changes for incremental rebuilds")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
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
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a JSON-lines event log and print a summary
    Replay {
        /// Event log, one step per line
        file: PathBuf,
        /// Load and save store state under the workspace, journaling flushes
        #[arg(long)]
        persist: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}
