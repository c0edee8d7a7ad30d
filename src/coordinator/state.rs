//! Coordinator states and the actions each state allows per event.

use crate::coordinator::actions::BuildAction;
use crate::coordinator::events::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of the rebuild coordinator.
///
/// Which phase is current is decided by the caller; this type only carries the
/// capability table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Bootstrapping; the store may not be bound yet.
    #[default]
    Initializing,
    /// Nothing reads the store; mutations may be applied directly.
    Idle,
    /// A query pass is reading the store.
    RunningQueries,
    /// Collecting a burst of changes before the next pass.
    Waiting,
    /// Writing page output.
    Building,
}

impl CoordinatorState {
    /// True if direct store writes are safe in this state.
    pub fn allows_direct_mutation(self) -> bool {
        matches!(self, CoordinatorState::Idle)
    }

    pub fn name(self) -> &'static str {
        match self {
            CoordinatorState::Initializing => "initializing",
            CoordinatorState::Idle => "idle",
            CoordinatorState::RunningQueries => "running_queries",
            CoordinatorState::Waiting => "waiting",
            CoordinatorState::Building => "building",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const APPLY: &[BuildAction] = &[BuildAction::CallApi];
const DEFER: &[BuildAction] = &[BuildAction::AddNodeMutation];
const DEFER_AND_MARK: &[BuildAction] = &[BuildAction::MarkNodesDirty, BuildAction::AddNodeMutation];
const FILES_DIRTY: &[BuildAction] = &[BuildAction::MarkFilesDirty];
const CHANGED_PAGES: &[BuildAction] = &[BuildAction::AssignChangedPages];
const REBIND: &[BuildAction] = &[BuildAction::AssignNodeQueryRunner];

/// Actions to run, in order, when `event` arrives in `state`.
pub fn reactions(state: CoordinatorState, event: EventKind) -> &'static [BuildAction] {
    use CoordinatorState::*;
    match (event, state) {
        (EventKind::NodeMutation, Idle) => APPLY,
        (EventKind::NodeMutation, RunningQueries) => DEFER_AND_MARK,
        (EventKind::NodeMutation, Initializing | Waiting | Building) => DEFER,
        (EventKind::SourceFileChanged, _) => FILES_DIRTY,
        (EventKind::PageDiffComplete, _) => CHANGED_PAGES,
        (EventKind::StoreBound, _) => REBIND,
    }
}
