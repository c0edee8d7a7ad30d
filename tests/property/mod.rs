//! Property-based tests for batching and merge guarantees

mod batch;
mod dedup_merge;
