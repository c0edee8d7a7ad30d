//! Integration tests for routing events through coordinator states and flushing

use rebuild_batch::config::CoordinatorConfig;
use rebuild_batch::coordinator::{
    Coordinator, CoordinatorEvent, CoordinatorState, DiffResult, MutationEvent,
};
use rebuild_batch::error::CoordinatorError;
use rebuild_batch::store::DataStore;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

fn post(id: &str, title: &str) -> CoordinatorEvent {
    CoordinatorEvent::mutation(
        "createNode",
        vec![json!({"id": id, "title": title, "internal": {"type": "Post"}})],
    )
}

fn diff(changed: &[&str], deleted: &[&str]) -> CoordinatorEvent {
    CoordinatorEvent::PageDiffComplete {
        data: DiffResult {
            changed_pages: changed.iter().map(|p| p.to_string()).collect(),
            deleted_pages: deleted.iter().map(|p| p.to_string()).collect(),
        },
    }
}

fn bound_coordinator() -> (Coordinator, Arc<DataStore>) {
    let store = Arc::new(DataStore::new());
    let mut coordinator = Coordinator::new(CoordinatorConfig::default());
    coordinator.bind_store(&store).unwrap();
    (coordinator, store)
}

#[test]
fn test_idle_mutations_reach_the_store_immediately() {
    let (mut coordinator, store) = bound_coordinator();
    coordinator.transition_to(CoordinatorState::Idle);

    coordinator.handle(post("a", "First")).unwrap();

    assert!(store.get_node("a").is_some());
    assert!(coordinator.context().node_mutation_batch.is_empty());
}

#[test]
fn test_mutations_during_query_pass_are_batched_in_order() {
    let (mut coordinator, store) = bound_coordinator();
    coordinator.transition_to(CoordinatorState::RunningQueries);

    let events: Vec<CoordinatorEvent> = (0..5).map(|i| post(&format!("n{}", i), "t")).collect();
    for event in &events {
        coordinator.handle(event.clone()).unwrap();
    }

    assert_eq!(store.node_count(), 0, "reads must see a stable store");
    let batch: Vec<&MutationEvent> = coordinator.context().node_mutation_batch.iter().collect();
    assert_eq!(batch.len(), events.len());
    for (queued, event) in batch.iter().zip(&events) {
        match event {
            CoordinatorEvent::NodeMutation { payload } => assert_eq!(*queued, payload),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(coordinator.context().nodes_mutated_during_query_run);
}

#[test]
fn test_diff_rounds_accumulate_pages() {
    let (mut coordinator, _store) = bound_coordinator();
    coordinator.handle(diff(&["/p1/", "/p2/"], &[])).unwrap();
    coordinator.handle(diff(&["/p2/", "/p3/"], &["/old/"])).unwrap();

    assert_eq!(coordinator.context().pages_to_build, vec!["/p1/", "/p2/", "/p3/"]);
    assert_eq!(coordinator.context().pages_to_delete, vec!["/old/"]);
}

#[test]
fn test_files_dirty_is_idempotent() {
    let (mut coordinator, _store) = bound_coordinator();
    let change = CoordinatorEvent::SourceFileChanged {
        path: PathBuf::from("src/pages/index.js"),
    };
    coordinator.handle(change.clone()).unwrap();
    coordinator.handle(change).unwrap();

    let context = coordinator.context();
    assert!(context.files_dirty);
    assert!(!context.nodes_mutated_during_query_run);
    assert!(context.node_mutation_batch.is_empty());
}

#[test]
fn test_flush_replays_batch_and_resets_context() {
    let (mut coordinator, store) = bound_coordinator();
    coordinator.transition_to(CoordinatorState::RunningQueries);
    coordinator.handle(post("a", "A")).unwrap();
    coordinator.handle(post("b", "B")).unwrap();
    coordinator
        .handle(CoordinatorEvent::mutation("deleteNode", vec![json!({"id": "a"})]))
        .unwrap();
    coordinator.handle(diff(&["/b/"], &["/a/"])).unwrap();

    assert!(matches!(coordinator.flush(), Err(CoordinatorError::QueryInFlight)));

    coordinator.transition_to(CoordinatorState::Waiting);
    let report = coordinator.flush().unwrap();

    assert_eq!(report.mutations_applied, 3);
    assert_eq!(report.pages_to_build, vec!["/b/"]);
    assert_eq!(report.pages_to_delete, vec!["/a/"]);
    assert!(report.nodes_dirty);
    assert!(store.get_node("a").is_none());
    assert!(store.get_node("b").is_some());
    assert!(!coordinator.context().has_pending_work());
    assert!(coordinator.flush().unwrap().is_empty());
}

#[test]
fn test_flush_is_all_or_nothing() {
    let (mut coordinator, store) = bound_coordinator();
    coordinator.transition_to(CoordinatorState::Building);
    coordinator.handle(post("a", "A")).unwrap();
    coordinator
        .handle(CoordinatorEvent::mutation(
            "createParentChildLink",
            vec![json!({"parent": {"id": "missing"}, "child": {"id": "a"}})],
        ))
        .unwrap();

    assert!(coordinator.flush().is_err());
    assert_eq!(store.node_count(), 0);
    assert_eq!(store.revision(), 0);
    assert_eq!(coordinator.context().node_mutation_batch.len(), 2);
}

#[test]
fn test_flush_without_store_keeps_work_queued() {
    let mut coordinator = Coordinator::new(CoordinatorConfig::default());
    coordinator.handle(post("a", "A")).unwrap();
    coordinator.handle(diff(&["/a/"], &[])).unwrap();

    let report = coordinator.flush().unwrap();
    assert!(report.is_empty());
    assert_eq!(coordinator.context().node_mutation_batch.len(), 1);
    assert_eq!(coordinator.context().pages_to_build, vec!["/a/"]);

    let store = Arc::new(DataStore::new());
    coordinator.bind_store(&store).unwrap();
    assert_eq!(coordinator.flush().unwrap().mutations_applied, 1);
    assert!(store.get_node("a").is_some());
}

#[test]
fn test_unknown_operations_are_skipped_on_flush() {
    let (mut coordinator, store) = bound_coordinator();
    coordinator.transition_to(CoordinatorState::Waiting);
    coordinator.handle(post("a", "A")).unwrap();
    coordinator
        .handle(CoordinatorEvent::mutation("setSchemaCustomization", vec![json!({})]))
        .unwrap();

    let report = coordinator.flush().unwrap();
    assert_eq!(report.mutations_applied, 1);
    assert_eq!(report.mutations_skipped, 1);
    assert_eq!(store.node_count(), 1);
}
