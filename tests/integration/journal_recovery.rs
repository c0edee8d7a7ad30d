//! Integration tests for journaled flushes and store persistence

use rebuild_batch::config::CoordinatorConfig;
use rebuild_batch::coordinator::{
    BatchJournal, Coordinator, CoordinatorEvent, CoordinatorState, JournalEntry, MutationEvent,
    PendingPages,
};
use rebuild_batch::store::{DataStore, SledStatePersistence};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn create(id: &str) -> MutationEvent {
    MutationEvent::new("createNode", vec![json!({"id": id, "internal": {"type": "Post"}})])
}

#[test]
fn test_interrupted_flush_is_recovered_and_replayed() {
    let journal_dir = TempDir::new().unwrap();

    // Leave behind what a crash between journaling and applying would.
    {
        let journal = BatchJournal::open(journal_dir.path()).unwrap();
        journal
            .record(&JournalEntry {
                batch: vec![create("a"), create("b")],
                pending: PendingPages {
                    pages_to_build: vec!["/a/".to_string()],
                    pages_to_delete: vec![],
                    files_dirty: true,
                    nodes_dirty: false,
                },
            })
            .unwrap();
    }

    let store = Arc::new(DataStore::new());
    let mut coordinator = Coordinator::new(CoordinatorConfig::default())
        .with_journal(BatchJournal::open(journal_dir.path()).unwrap());
    coordinator.bind_store(&store).unwrap();
    coordinator.transition_to(CoordinatorState::Waiting);
    coordinator
        .handle(CoordinatorEvent::NodeMutation { payload: create("c") })
        .unwrap();

    assert_eq!(coordinator.recover().unwrap(), 2);
    let queued: Vec<&str> = coordinator
        .context()
        .node_mutation_batch
        .iter()
        .filter_map(|m| m.payload[0]["id"].as_str())
        .collect();
    assert_eq!(queued, vec!["a", "b", "c"]);
    assert!(coordinator.context().files_dirty);

    let report = coordinator.flush().unwrap();
    assert_eq!(report.mutations_applied, 3);
    assert_eq!(report.pages_to_build, vec!["/a/"]);
    assert_eq!(store.node_count(), 3);

    assert_eq!(coordinator.recover().unwrap(), 0, "a journal is only recovered once");
}

#[test]
fn test_disabled_journal_is_not_written() {
    let journal_dir = TempDir::new().unwrap();
    let config = CoordinatorConfig {
        journal_enabled: false,
        ..CoordinatorConfig::default()
    };
    let store = Arc::new(DataStore::new());
    let mut coordinator =
        Coordinator::new(config).with_journal(BatchJournal::open(journal_dir.path()).unwrap());
    coordinator.bind_store(&store).unwrap();
    coordinator
        .handle(CoordinatorEvent::NodeMutation { payload: create("a") })
        .unwrap();

    assert_eq!(coordinator.recover().unwrap(), 0);
    assert_eq!(coordinator.flush().unwrap().mutations_applied, 1);
}

#[test]
fn test_flushed_state_survives_restart() {
    let state_dir = TempDir::new().unwrap();
    let store = Arc::new(DataStore::new());
    let mut coordinator = Coordinator::new(CoordinatorConfig::default());
    coordinator.bind_store(&store).unwrap();
    coordinator.transition_to(CoordinatorState::Building);
    coordinator
        .handle(CoordinatorEvent::NodeMutation { payload: create("a") })
        .unwrap();
    coordinator
        .handle(CoordinatorEvent::mutation(
            "createPage",
            vec![json!({"path": "/a/", "component": "post.js", "context": {"id": "a"}})],
        ))
        .unwrap();
    coordinator.transition_to(CoordinatorState::Idle);
    coordinator.flush().unwrap();

    {
        let persistence = SledStatePersistence::new(state_dir.path()).unwrap();
        persistence.save_state(&store.snapshot()).unwrap();
    }

    let persistence = SledStatePersistence::new(state_dir.path()).unwrap();
    let restored = DataStore::from_state(persistence.load_state().unwrap());
    assert_eq!(restored.snapshot(), store.snapshot());
    assert_eq!(restored.get_page("/a/").unwrap().context, json!({"id": "a"}));
}
