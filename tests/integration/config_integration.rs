//! Integration tests for configuration loading

use rebuild_batch::config::{ConfigLoader, RebuildConfig};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_explicit_file_layers_over_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rebuild.toml");
    std::fs::write(
        &path,
        r#"
[coordinator]
journal_enabled = false

[logging]
output = "file"
file = "logs/rebuild.log"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&path).unwrap();
    assert!(!config.coordinator.journal_enabled);
    assert_eq!(config.coordinator.batch_warning_threshold, 1000);
    assert_eq!(config.storage.state_path, PathBuf::from(".rebuild/state"));
    assert_eq!(config.logging.output, "file");
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rebuild.toml");
    std::fs::write(
        &path,
        r#"
[coordinator]
batch_warning_threshold = 0

[storage]
state_path = ".rebuild/shared"
journal_path = ".rebuild/shared"
"#,
    )
    .unwrap();

    let errors = ConfigLoader::load_from_file(&path).unwrap().validate().unwrap_err();
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = RebuildConfig::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed: RebuildConfig = toml::from_str(&rendered).unwrap();
    assert_eq!(
        parsed.coordinator.batch_warning_threshold,
        config.coordinator.batch_warning_threshold
    );
    assert_eq!(parsed.storage.journal_path, config.storage.journal_path);
}

#[test]
fn test_storage_paths_resolve_against_workspace() {
    let config = RebuildConfig::default();
    let root = PathBuf::from("/srv/site");
    assert_eq!(config.storage.state_dir(&root), root.join(".rebuild/state"));
    assert_eq!(config.storage.journal_dir(&root), root.join(".rebuild/journal"));
}
