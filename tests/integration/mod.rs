//! Integration tests for the rebuild batching layer

mod config_integration;
mod coordinator_flow;
mod dispatch_bridge;
mod journal_recovery;
