//! Integration tests for applying mutation events to a live store

use rebuild_batch::coordinator::{apply_mutation, MutationEvent};
use rebuild_batch::store::{ActionDispatcher, DataStore};
use serde_json::json;

fn seeded_store() -> DataStore {
    let store = DataStore::new();
    apply_mutation(
        &MutationEvent::new(
            "createNode",
            vec![json!({"id": "post-1", "title": "Hello", "internal": {"type": "Post"}})],
        ),
        Some(&store),
    )
    .unwrap();
    store
}

#[test]
fn test_no_store_is_a_successful_no_op() {
    let event = MutationEvent::new("createNode", vec![json!({"id": "x", "internal": {"type": "T"}})]);
    assert!(apply_mutation(&event, None).is_ok());
}

#[test]
fn test_unknown_operation_leaves_store_unchanged() {
    let store = seeded_store();
    let before = store.snapshot();
    let revision = store.revision();

    apply_mutation(
        &MutationEvent::new("createResolverContext", vec![json!({"anything": true})]),
        Some(&store),
    )
    .unwrap();

    assert_eq!(store.snapshot(), before);
    assert_eq!(store.revision(), revision);
}

#[test]
fn test_registered_operations_apply_synchronously() {
    let store = seeded_store();

    apply_mutation(
        &MutationEvent::new(
            "createNodeField",
            vec![json!({"node": {"id": "post-1"}, "name": "slug", "value": "/hello/"})],
        ),
        Some(&store),
    )
    .unwrap();
    assert_eq!(store.get_node("post-1").unwrap().fields["slug"], json!("/hello/"));

    apply_mutation(
        &MutationEvent::new(
            "createPage",
            vec![json!({"path": "/hello/", "component": "src/templates/post.js", "context": {"id": "post-1"}})],
        ),
        Some(&store),
    )
    .unwrap();
    assert_eq!(store.get_page("/hello/").unwrap().component, "src/templates/post.js");

    apply_mutation(
        &MutationEvent::new("deletePage", vec![json!({"path": "/hello/"})]),
        Some(&store),
    )
    .unwrap();
    assert!(store.get_page("/hello/").is_none());
}

#[test]
fn test_malformed_payload_is_a_contract_violation() {
    let store = seeded_store();
    let before = store.snapshot();

    let err = apply_mutation(
        &MutationEvent::new("createPage", vec![json!("not a page")]),
        Some(&store),
    )
    .unwrap_err();

    assert!(err.is_contract_violation());
    assert_eq!(store.snapshot(), before);
}

#[test]
fn test_missing_node_surfaces_store_error() {
    let store = DataStore::new();
    let err = apply_mutation(
        &MutationEvent::new(
            "createNodeField",
            vec![json!({"node": {"id": "ghost"}, "name": "slug", "value": "/"})],
        ),
        Some(&store),
    )
    .unwrap_err();
    assert!(!err.is_contract_violation());
}

#[test]
fn test_delete_cascades_to_children() {
    let store = seeded_store();
    apply_mutation(
        &MutationEvent::new(
            "createNode",
            vec![json!({"id": "comment-1", "parent": "post-1", "internal": {"type": "Comment"}})],
        ),
        Some(&store),
    )
    .unwrap();
    assert_eq!(store.get_node("post-1").unwrap().children, vec!["comment-1"]);

    apply_mutation(
        &MutationEvent::new("deleteNode", vec![json!({"id": "post-1"})]),
        Some(&store as &dyn ActionDispatcher),
    )
    .unwrap();
    assert_eq!(store.node_count(), 0);
}
