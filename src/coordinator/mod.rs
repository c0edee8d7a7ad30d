//! Rebuild Coordinator
//!
//! Owns the [`CoordinatorContext`] and routes incoming events to build actions
//! through the per-state capability table in [`state::reactions`]. Mutations that
//! arrive while the store is being read are batched; [`Coordinator::flush`]
//! replays the batch all-or-nothing once the caller reaches a safe point.

pub mod actions;
pub mod context;
pub mod dispatch;
pub mod events;
pub mod journal;
pub mod merge;
pub mod state;

pub use actions::BuildAction;
pub use context::CoordinatorContext;
pub use dispatch::apply_mutation;
pub use events::{CoordinatorEvent, DiffResult, EventKind, MutationEvent};
pub use journal::{BatchJournal, FlushJournal, JournalEntry, PendingPages};
pub use merge::dedup_merge;
pub use state::{reactions, CoordinatorState};

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::query::QueryRunner;
use crate::reporter::{Reporter, TracingReporter};
use crate::store::{ActionDispatcher, DataStore, StatePersister};
use crate::types::PageId;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Queued mutations replayed against the store.
    pub mutations_applied: usize,
    /// Queued mutations dropped because their operation is not registered.
    pub mutations_skipped: usize,
    pub pages_to_build: Vec<PageId>,
    pub pages_to_delete: Vec<PageId>,
    pub files_dirty: bool,
    pub nodes_dirty: bool,
    /// Store revision after the replay.
    pub store_revision: u64,
    /// RFC 3339 timestamp; empty when nothing was flushed.
    pub flushed_at: String,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.mutations_applied == 0
            && self.mutations_skipped == 0
            && self.pages_to_build.is_empty()
            && self.pages_to_delete.is_empty()
            && !self.files_dirty
            && !self.nodes_dirty
    }
}

/// Single-writer coordinator over one context.
pub struct Coordinator {
    context: CoordinatorContext,
    state: CoordinatorState,
    config: CoordinatorConfig,
    reporter: Arc<dyn Reporter>,
    journal: Option<Box<dyn FlushJournal>>,
    persister: Option<Arc<dyn StatePersister>>,
    recovered: bool,
    batch_warned: bool,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_reporter(config, Arc::new(TracingReporter))
    }

    pub fn with_reporter(config: CoordinatorConfig, reporter: Arc<dyn Reporter>) -> Self {
        Coordinator {
            context: CoordinatorContext::new(),
            state: CoordinatorState::default(),
            config,
            reporter,
            journal: None,
            persister: None,
            recovered: false,
            batch_warned: false,
        }
    }

    /// Journal flushes to `journal`. Ignored when journaling is disabled in config.
    pub fn with_journal(mut self, journal: impl FlushJournal + 'static) -> Self {
        if self.config.journal_enabled {
            self.journal = Some(Box::new(journal));
        } else {
            debug!("Journaling disabled; flushes are not journaled");
        }
        self
    }

    /// Persist store contents after each replay, before the journal entry is dropped.
    pub fn with_persister(mut self, persister: Arc<dyn StatePersister>) -> Self {
        self.persister = Some(persister);
        self
    }

    pub fn context(&self) -> &CoordinatorContext {
        &self.context
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn transition_to(&mut self, state: CoordinatorState) {
        if state != self.state {
            debug!(from = %self.state, to = %state, "Coordinator state change");
            self.state = state;
        }
    }

    /// Bind `store` and rebuild the query runner against it.
    pub fn bind_store(&mut self, store: &Arc<DataStore>) -> Result<(), CoordinatorError> {
        self.context.bind_store(store);
        info!(epoch = %self.context.store_epoch, "Store bound");
        self.handle(CoordinatorEvent::StoreBound)
    }

    /// Route `event` through the capability table for the current state.
    pub fn handle(&mut self, event: CoordinatorEvent) -> Result<(), CoordinatorError> {
        let actions = reactions(self.state, event.kind());
        debug!(
            state = %self.state,
            event = event.kind().name(),
            actions = actions.len(),
            "Handling event"
        );
        for action in actions {
            action.run(&mut self.context, &event, &self.reporter)?;
        }
        self.check_batch_size();
        Ok(())
    }

    /// The cached query runner, rebound first if the store binding moved on.
    pub fn ensure_query_runner(&mut self) -> Option<&QueryRunner> {
        if self.context.query_runner_is_stale() {
            actions::assign_node_query_runner(&mut self.context, &self.reporter);
        }
        self.context.node_query_runner.as_ref()
    }

    /// Replay the batch against the store and drain the pending sets.
    ///
    /// Refused while a query pass runs. Without a store everything stays queued.
    /// Every queued mutation is decoded before anything is written, so a
    /// malformed one aborts the flush with nothing applied.
    pub fn flush(&mut self) -> Result<FlushReport, CoordinatorError> {
        if self.state == CoordinatorState::RunningQueries {
            return Err(CoordinatorError::QueryInFlight);
        }

        let Some(store) = self.context.store() else {
            warn!(
                queued = self.context.node_mutation_batch.len(),
                "No store bound; flush deferred"
            );
            return Ok(FlushReport::default());
        };

        if !self.context.has_pending_work() {
            return Ok(FlushReport {
                store_revision: store.revision(),
                ..Default::default()
            });
        }

        let mut replay = Vec::with_capacity(self.context.node_mutation_batch.len());
        for event in &self.context.node_mutation_batch {
            if let Some(action) = dispatch::decode_mutation(event)? {
                replay.push(action);
            }
        }
        let skipped = self.context.node_mutation_batch.len() - replay.len();

        if let Some(journal) = &self.journal {
            journal.record(&self.journal_entry())?;
            // From here the journal describes this process's batch, not a crashed one.
            self.recovered = true;
        }

        let applied = match store.apply_all(replay) {
            Ok(applied) => applied,
            Err(e) => {
                // The batch is still queued in memory; a stale journal would replay it twice.
                if let Some(journal) = &self.journal {
                    if let Err(clear_err) = journal.clear() {
                        warn!(error = %clear_err, "Failed to clear journal after rejected replay");
                    }
                }
                return Err(e.into());
            }
        };

        // The store now holds the batch, so it must leave the context whatever follows.
        self.context.node_mutation_batch.clear();
        let report = FlushReport {
            mutations_applied: applied,
            mutations_skipped: skipped,
            pages_to_build: std::mem::take(&mut self.context.pages_to_build),
            pages_to_delete: std::mem::take(&mut self.context.pages_to_delete),
            files_dirty: std::mem::replace(&mut self.context.files_dirty, false),
            nodes_dirty: std::mem::replace(&mut self.context.nodes_mutated_during_query_run, false),
            store_revision: store.revision(),
            flushed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        self.batch_warned = false;

        if let Some(persister) = &self.persister {
            if let Err(e) = persister.persist(&store.snapshot()) {
                warn!(error = %e, "Failed to persist store; journal entry kept for recovery");
                return Err(e.into());
            }
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.clear() {
                warn!(error = %e, "Failed to clear journal after flush");
            }
        }

        info!(
            applied = report.mutations_applied,
            skipped = report.mutations_skipped,
            pages_to_build = report.pages_to_build.len(),
            pages_to_delete = report.pages_to_delete.len(),
            revision = report.store_revision,
            "Flushed batch"
        );
        Ok(report)
    }

    /// Restore a batch left behind by an interrupted flush.
    ///
    /// Journaled mutations go ahead of anything queued since; page sets are merged
    /// and flags combined. Returns how many mutations were restored. Only the
    /// first call restores anything.
    pub fn recover(&mut self) -> Result<usize, CoordinatorError> {
        if self.recovered {
            debug!("Journal already recovered");
            return Ok(0);
        }
        self.recovered = true;
        let Some(journal) = &self.journal else {
            return Ok(0);
        };
        let Some(entry) = journal.load()? else {
            return Ok(0);
        };

        let restored = entry.batch.len();
        let queued = std::mem::take(&mut self.context.node_mutation_batch);
        self.context.node_mutation_batch = entry.batch;
        self.context.node_mutation_batch.extend(queued);

        let context = &mut self.context;
        context.pages_to_build = dedup_merge(&entry.pending.pages_to_build, &context.pages_to_build);
        context.pages_to_delete =
            dedup_merge(&entry.pending.pages_to_delete, &context.pages_to_delete);
        context.files_dirty |= entry.pending.files_dirty;
        context.nodes_mutated_during_query_run |= entry.pending.nodes_dirty;

        info!(restored, "Recovered journaled batch");
        Ok(restored)
    }

    fn journal_entry(&self) -> JournalEntry {
        JournalEntry {
            batch: self.context.node_mutation_batch.clone(),
            pending: PendingPages {
                pages_to_build: self.context.pages_to_build.clone(),
                pages_to_delete: self.context.pages_to_delete.clone(),
                files_dirty: self.context.files_dirty,
                nodes_dirty: self.context.nodes_mutated_during_query_run,
            },
        }
    }

    fn check_batch_size(&mut self) {
        let queued = self.context.node_mutation_batch.len();
        if !self.batch_warned && queued >= self.config.batch_warning_threshold {
            self.batch_warned = true;
            warn!(
                queued,
                threshold = self.config.batch_warning_threshold,
                "Mutation batch is growing; is the coordinator ever reaching a flush point?"
            );
        }
    }
}
