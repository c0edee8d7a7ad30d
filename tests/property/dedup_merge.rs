//! Property-based tests for order-preserving deduplicating merge

use proptest::prelude::*;
use rebuild_batch::coordinator::dedup_merge;
use std::collections::HashSet;

fn dedup(items: Vec<u8>) -> Vec<u8> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(*i)).collect()
}

/// Merging a duplicate-free sequence with itself returns it unchanged
#[test]
fn test_merge_with_self_is_identity() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&any::<Vec<u8>>(), |items| {
            let unique = dedup(items);
            assert_eq!(dedup_merge(&unique, &unique), unique);
            Ok(())
        })
        .unwrap();
}

/// The existing sequence keeps its order and new entries follow in arrival order
#[test]
fn test_merge_preserves_first_appearance_order() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<Vec<u8>>(), any::<Vec<u8>>()), |(left, right)| {
            let merged = dedup_merge(&left, &right);

            let mut concatenated = left.clone();
            concatenated.extend(right.iter().copied());
            assert_eq!(merged, dedup(concatenated));

            let unique_left = dedup(left);
            assert_eq!(&merged[..unique_left.len()], unique_left.as_slice());
            Ok(())
        })
        .unwrap();
}

/// Repeated rounds never grow the result with entries already present
#[test]
fn test_merge_rounds_are_stable() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(any::<Vec<u8>>(), any::<Vec<u8>>()), |(left, right)| {
            let once = dedup_merge(&left, &right);
            let twice = dedup_merge(&once, &right);
            assert_eq!(once, twice);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_overlapping_pages_example() {
    let a = vec!["a", "b"];
    let b = vec!["b", "c"];
    assert_eq!(dedup_merge(&a, &b), vec!["a", "b", "c"]);
}
