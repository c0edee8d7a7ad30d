//! Order-preserving duplicate-free merge of identifier sequences.

use std::collections::HashSet;
use std::hash::Hash;

/// Concatenate `left` and `right`, keeping only the first occurrence of each item.
///
/// Entries already in `left` keep their order; new entries from `right` are
/// appended in arrival order.
pub fn dedup_merge<T>(left: &[T], right: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen: HashSet<&T> = HashSet::with_capacity(left.len() + right.len());
    let mut merged = Vec::with_capacity(left.len() + right.len());
    for item in left.iter().chain(right) {
        if seen.insert(item) {
            merged.push(item.clone());
        }
    }
    merged
}
