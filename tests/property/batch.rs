//! Property-based tests for batching and dirty-flag handlers

use proptest::prelude::*;
use rebuild_batch::coordinator::actions::{
    add_node_mutation, assign_changed_pages, mark_files_dirty, mark_nodes_dirty,
};
use rebuild_batch::coordinator::{CoordinatorContext, DiffResult, MutationEvent};
use rebuild_batch::store::DataStore;
use serde_json::json;
use std::sync::Arc;

fn mutation_strategy() -> impl Strategy<Value = MutationEvent> {
    (
        prop::sample::select(vec!["createNode", "touchNode", "deleteNode", "futureOp"]),
        "[a-z]{1,6}",
    )
        .prop_map(|(op, id)| {
            MutationEvent::new(op, vec![json!({"id": id, "internal": {"type": "T"}})])
        })
}

/// The batch holds exactly the appended events, in call order, and the store is never touched
#[test]
fn test_batch_monotonicity() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&prop::collection::vec(mutation_strategy(), 0..40), |events| {
            let store = Arc::new(DataStore::new());
            let mut context = CoordinatorContext::with_store(&store);

            for event in &events {
                add_node_mutation(&mut context, event.clone());
            }

            assert_eq!(context.node_mutation_batch, events);
            assert_eq!(store.node_count(), 0);
            assert_eq!(store.revision(), 0);
            Ok(())
        })
        .unwrap();
}

/// Diff rounds only ever append pages not yet pending
#[test]
fn test_diff_accumulation_has_no_duplicates() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let page = prop::sample::select(vec!["/", "/a/", "/b/", "/c/", "/d/"]);
    let round = (
        prop::collection::vec(page.clone(), 0..6),
        prop::collection::vec(page, 0..6),
    );

    runner
        .run(&prop::collection::vec(round, 1..8), |rounds| {
            let mut context = CoordinatorContext::new();
            for (changed, deleted) in &rounds {
                let before = context.pages_to_build.clone();
                assign_changed_pages(
                    &mut context,
                    &DiffResult {
                        changed_pages: changed.iter().map(|p| p.to_string()).collect(),
                        deleted_pages: deleted.iter().map(|p| p.to_string()).collect(),
                    },
                );
                assert_eq!(&context.pages_to_build[..before.len()], before.as_slice());
            }

            let mut unique = context.pages_to_build.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), context.pages_to_build.len());
            Ok(())
        })
        .unwrap();
}

/// Setting a flag any number of times leaves it set and the other flag alone
#[test]
fn test_dirty_flags_are_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1usize..10, 0usize..10), |(file_marks, node_marks)| {
            let mut context = CoordinatorContext::new();
            for _ in 0..file_marks {
                mark_files_dirty(&mut context);
            }
            assert!(context.files_dirty);
            assert_eq!(context.nodes_mutated_during_query_run, false);

            for _ in 0..node_marks {
                mark_nodes_dirty(&mut context);
            }
            assert_eq!(context.nodes_mutated_during_query_run, node_marks > 0);
            assert!(context.files_dirty);
            assert!(context.node_mutation_batch.is_empty());
            Ok(())
        })
        .unwrap();
}
