//! Rebuild Batch: mutation batching for incremental site rebuilds
//!
//! Collects data-store mutations, page diffs and source-file changes while a
//! rebuild coordinator is busy, and replays them against the store once it is
//! safe. The store is held weakly and every rebind bumps a [`types::StoreEpoch`],
//! so a query runner bound to a replaced store is never reused.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod query;
pub mod reporter;
pub mod store;
pub mod types;
