//! Build actions
//!
//! The handlers the coordinator runs in reaction to events. Each one updates the
//! coordinator context; only [`call_api`] reaches the store.

use crate::coordinator::context::CoordinatorContext;
use crate::coordinator::dispatch::apply_mutation;
use crate::coordinator::events::{CoordinatorEvent, DiffResult, MutationEvent};
use crate::coordinator::merge::dedup_merge;
use crate::error::CoordinatorError;
use crate::query::QueryRunner;
use crate::reporter::Reporter;
use crate::store::ActionDispatcher;
use std::sync::Arc;
use tracing::debug;

/// Named build actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildAction {
    CallApi,
    AddNodeMutation,
    AssignChangedPages,
    MarkFilesDirty,
    MarkNodesDirty,
    AssignNodeQueryRunner,
}

impl BuildAction {
    pub const ALL: [BuildAction; 6] = [
        BuildAction::CallApi,
        BuildAction::AddNodeMutation,
        BuildAction::AssignChangedPages,
        BuildAction::MarkFilesDirty,
        BuildAction::MarkNodesDirty,
        BuildAction::AssignNodeQueryRunner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuildAction::CallApi => "callApi",
            BuildAction::AddNodeMutation => "addNodeMutation",
            BuildAction::AssignChangedPages => "assignChangedPages",
            BuildAction::MarkFilesDirty => "markFilesDirty",
            BuildAction::MarkNodesDirty => "markNodesDirty",
            BuildAction::AssignNodeQueryRunner => "assignNodeQueryRunner",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }

    /// Run this action for `event`.
    ///
    /// Actions that read a payload require the matching event; any other event
    /// is the caller breaking the handler's contract.
    pub fn run(
        self,
        context: &mut CoordinatorContext,
        event: &CoordinatorEvent,
        reporter: &Arc<dyn Reporter>,
    ) -> Result<(), CoordinatorError> {
        debug!(action = self.name(), event = event.kind().name(), "Running build action");
        match (self, event) {
            (BuildAction::CallApi, CoordinatorEvent::NodeMutation { payload }) => {
                call_api(context, payload)
            }
            (BuildAction::AddNodeMutation, CoordinatorEvent::NodeMutation { payload }) => {
                add_node_mutation(context, payload.clone());
                Ok(())
            }
            (BuildAction::AssignChangedPages, CoordinatorEvent::PageDiffComplete { data }) => {
                assign_changed_pages(context, data);
                Ok(())
            }
            (BuildAction::MarkFilesDirty, _) => {
                mark_files_dirty(context);
                Ok(())
            }
            (BuildAction::MarkNodesDirty, _) => {
                mark_nodes_dirty(context);
                Ok(())
            }
            (BuildAction::AssignNodeQueryRunner, _) => {
                assign_node_query_runner(context, reporter);
                Ok(())
            }
            (action, event) => Err(CoordinatorError::EventMismatch {
                action: action.name(),
                event: event.kind().name(),
            }),
        }
    }
}

/// Apply a mutation to the bound store right away.
///
/// Only legal in states where no query pass is reading the store.
pub fn call_api(
    context: &CoordinatorContext,
    mutation: &MutationEvent,
) -> Result<(), CoordinatorError> {
    let store = context.store();
    apply_mutation(mutation, store.as_deref().map(|s| s as &dyn ActionDispatcher))
}

/// Defer a mutation by appending it to the batch.
pub fn add_node_mutation(context: &mut CoordinatorContext, mutation: MutationEvent) {
    context.node_mutation_batch.push(mutation);
}

/// Fold a page diff into the pending build and delete sets.
pub fn assign_changed_pages(context: &mut CoordinatorContext, diff: &DiffResult) {
    context.pages_to_build = dedup_merge(&context.pages_to_build, &diff.changed_pages);
    context.pages_to_delete = dedup_merge(&context.pages_to_delete, &diff.deleted_pages);
}

pub fn mark_files_dirty(context: &mut CoordinatorContext) {
    context.files_dirty = true;
}

pub fn mark_nodes_dirty(context: &mut CoordinatorContext) {
    context.nodes_mutated_during_query_run = true;
}

/// Bind a fresh query runner to the context's store, or clear it when there is none.
pub fn assign_node_query_runner(context: &mut CoordinatorContext, reporter: &Arc<dyn Reporter>) {
    context.node_query_runner = context
        .store()
        .map(|store| QueryRunner::bind(store, context.store_epoch, Arc::clone(reporter)));
}
