//! Events delivered to the coordinator and the payloads they carry.

use crate::types::PageId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// An instruction to mutate the store: an operation name plus positional arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    #[serde(rename = "type")]
    pub op: String,
    #[serde(default)]
    pub payload: Vec<Value>,
}

impl MutationEvent {
    pub fn new(op: impl Into<String>, payload: Vec<Value>) -> Self {
        MutationEvent {
            op: op.into(),
            payload,
        }
    }
}

/// Output of a page diff: pages to (re)build and pages to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    #[serde(default)]
    pub changed_pages: Vec<PageId>,
    #[serde(default)]
    pub deleted_pages: Vec<PageId>,
}

/// Discriminant of [`CoordinatorEvent`], used as the key of the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeMutation,
    SourceFileChanged,
    PageDiffComplete,
    StoreBound,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::NodeMutation => "ADD_NODE_MUTATION",
            EventKind::SourceFileChanged => "SOURCE_FILE_CHANGED",
            EventKind::PageDiffComplete => "PAGE_DIFF_COMPLETE",
            EventKind::StoreBound => "STORE_BOUND",
        }
    }
}

/// Events the coordinator reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinatorEvent {
    #[serde(rename = "ADD_NODE_MUTATION")]
    NodeMutation { payload: MutationEvent },
    SourceFileChanged { path: PathBuf },
    PageDiffComplete { data: DiffResult },
    StoreBound,
}

impl CoordinatorEvent {
    pub fn mutation(op: impl Into<String>, payload: Vec<Value>) -> Self {
        CoordinatorEvent::NodeMutation {
            payload: MutationEvent::new(op, payload),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            CoordinatorEvent::NodeMutation { .. } => EventKind::NodeMutation,
            CoordinatorEvent::SourceFileChanged { .. } => EventKind::SourceFileChanged,
            CoordinatorEvent::PageDiffComplete { .. } => EventKind::PageDiffComplete,
            CoordinatorEvent::StoreBound => EventKind::StoreBound,
        }
    }
}
