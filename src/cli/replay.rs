//! Replay driver: feeds a JSON-lines step log through a coordinator.
//!
//! Each non-empty line is one step:
//!
//! ```text
//! {"step":"enter","state":"running_queries"}
//! {"step":"bind"}
//! {"step":"event","event":{"type":"ADD_NODE_MUTATION","payload":{"type":"createNode","payload":[...]}}}
//! {"step":"flush"}
//! ```
//!
//! Lines starting with `#` are comments.

use crate::coordinator::{Coordinator, CoordinatorEvent, CoordinatorState, FlushReport};
use crate::store::DataStore;
use crate::types::PageId;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::sync::Arc;
use tracing::debug;

/// One line of a replay log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ReplayStep {
    /// Deliver an event to the coordinator.
    Event { event: CoordinatorEvent },
    /// Move the coordinator into `state`.
    Enter { state: CoordinatorState },
    /// Bind (or rebind) the replay store.
    Bind,
    /// Flush the batch at a safe point.
    Flush,
}

/// What a replay did and what it left pending.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub steps: usize,
    pub recovered: usize,
    pub state: CoordinatorState,
    pub pending_mutations: usize,
    pub pages_to_build: Vec<PageId>,
    pub pages_to_delete: Vec<PageId>,
    pub files_dirty: bool,
    pub nodes_dirty: bool,
    pub nodes: usize,
    pub pages: usize,
    pub store_revision: u64,
    pub flushes: Vec<FlushReport>,
    pub persisted: bool,
}

impl ReplaySummary {
    pub fn capture(coordinator: &Coordinator, store: &DataStore) -> Self {
        let context = coordinator.context();
        ReplaySummary {
            state: coordinator.state(),
            pending_mutations: context.node_mutation_batch.len(),
            pages_to_build: context.pages_to_build.clone(),
            pages_to_delete: context.pages_to_delete.clone(),
            files_dirty: context.files_dirty,
            nodes_dirty: context.nodes_mutated_during_query_run,
            nodes: store.node_count(),
            pages: store.page_count(),
            store_revision: store.revision(),
            ..Default::default()
        }
    }
}

/// Run every step in `reader` and return the number of steps and the flush reports.
pub fn replay_steps<R: BufRead>(
    reader: R,
    coordinator: &mut Coordinator,
    store: &Arc<DataStore>,
) -> anyhow::Result<(usize, Vec<FlushReport>)> {
    let mut steps = 0;
    let mut flushes = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("reading line {}", line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let step: ReplayStep = serde_json::from_str(trimmed)
            .with_context(|| format!("line {}: not a replay step", line_no))?;
        debug!(line = line_no, step = ?step, "Replaying step");

        match step {
            ReplayStep::Event { event } => coordinator
                .handle(event)
                .with_context(|| format!("line {}: event rejected", line_no))?,
            ReplayStep::Enter { state } => coordinator.transition_to(state),
            ReplayStep::Bind => coordinator
                .bind_store(store)
                .with_context(|| format!("line {}: bind failed", line_no))?,
            ReplayStep::Flush => flushes.push(
                coordinator
                    .flush()
                    .with_context(|| format!("line {}: flush failed", line_no))?,
            ),
        }
        steps += 1;
    }

    Ok((steps, flushes))
}
