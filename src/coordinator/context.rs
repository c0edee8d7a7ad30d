//! Coordinator context: everything the build actions read and update.

use crate::coordinator::events::MutationEvent;
use crate::query::QueryRunner;
use crate::store::DataStore;
use crate::types::{PageId, StoreEpoch};
use std::sync::{Arc, Weak};

/// State owned by one coordinator and passed by reference into every action.
#[derive(Debug, Default)]
pub struct CoordinatorContext {
    /// Store the coordinator is bound to. Absent before bootstrap.
    pub store: Option<Weak<DataStore>>,
    /// Bumped on every store binding.
    pub store_epoch: StoreEpoch,
    /// Deferred mutations, in application order.
    pub node_mutation_batch: Vec<MutationEvent>,
    pub pages_to_build: Vec<PageId>,
    pub pages_to_delete: Vec<PageId>,
    pub files_dirty: bool,
    pub nodes_mutated_during_query_run: bool,
    /// Cached query runner; `None` until bound or when no store is available.
    pub node_query_runner: Option<QueryRunner>,
}

impl CoordinatorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context already bound to `store` (epoch 1).
    pub fn with_store(store: &Arc<DataStore>) -> Self {
        let mut context = Self::new();
        context.bind_store(store);
        context
    }

    /// Point the context at `store` and advance the epoch.
    ///
    /// The cached query runner is left untouched; it is rebound explicitly.
    pub fn bind_store(&mut self, store: &Arc<DataStore>) {
        self.store = Some(Arc::downgrade(store));
        self.store_epoch = self.store_epoch.next();
    }

    /// Drop the store reference and advance the epoch.
    pub fn unbind_store(&mut self) {
        self.store = None;
        self.store_epoch = self.store_epoch.next();
    }

    /// The bound store, if one is bound and still alive.
    pub fn store(&self) -> Option<Arc<DataStore>> {
        self.store.as_ref().and_then(Weak::upgrade)
    }

    /// True when the cached runner was bound at an older epoch.
    pub fn query_runner_is_stale(&self) -> bool {
        match &self.node_query_runner {
            Some(runner) => runner.epoch() != self.store_epoch,
            None => self.store().is_some(),
        }
    }

    /// True if there is deferred work waiting for a flush.
    pub fn has_pending_work(&self) -> bool {
        !self.node_mutation_batch.is_empty()
            || !self.pages_to_build.is_empty()
            || !self.pages_to_delete.is_empty()
            || self.files_dirty
            || self.nodes_mutated_during_query_run
    }
}
