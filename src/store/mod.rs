//! Node Store
//!
//! In-process data store holding content nodes and pages. Mutations arrive as
//! [`StoreAction`]s, either one at a time through [`ActionDispatcher::dispatch`]
//! or as an all-or-nothing sequence through [`ActionDispatcher::apply_all`].

pub mod actions;
pub mod persistence;

pub use actions::{MutationOp, StoreAction};
pub use persistence::{SledStatePersistence, StatePersister};

use crate::error::StoreError;
use crate::types::{NodeId, PageId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Bookkeeping attributes every node carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInternal {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

/// A content node.
///
/// Attributes other than the structural ones are kept verbatim in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    pub internal: NodeInternal,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Node {
            id: id.into(),
            parent: None,
            children: Vec::new(),
            internal: NodeInternal {
                node_type: node_type.into(),
                content_digest: None,
                owner: None,
            },
            fields: Map::new(),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// The node as a JSON object, the shape queries run against.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Compute the content digest of a node: blake3 over its type and data attributes.
///
/// `serde_json::Map` keeps keys sorted, so the encoding is canonical.
pub fn content_digest(node: &Node) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(node.internal.node_type.as_bytes());
    hasher.update(&[0]);
    let encoded = serde_json::to_vec(&node.data).unwrap_or_default();
    hasher.update(&encoded);
    hex::encode(hasher.finalize().as_bytes())
}

/// A generated page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub path: PageId,
    pub component: String,
    #[serde(default)]
    pub context: Value,
}

/// Complete store contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub nodes: BTreeMap<NodeId, Node>,
    pub pages: BTreeMap<PageId, Page>,
    pub touched: BTreeSet<NodeId>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action. Returns whether the state changed.
    pub fn apply(&mut self, action: StoreAction) -> Result<bool, StoreError> {
        match action {
            StoreAction::CreateNode(node) => self.create_node(node),
            StoreAction::DeleteNode { id } => Ok(self.delete_node(&id)),
            StoreAction::TouchNode { id } => {
                if self.nodes.contains_key(&id) {
                    Ok(self.touched.insert(id))
                } else {
                    trace!(node_id = %id, "touchNode on unknown node");
                    Ok(false)
                }
            }
            StoreAction::CreateNodeField {
                node_id,
                name,
                value,
            } => {
                let node = self
                    .nodes
                    .get_mut(&node_id)
                    .ok_or_else(|| StoreError::NodeNotFound(node_id.clone()))?;
                let changed = node.fields.get(&name) != Some(&value);
                node.fields.insert(name, value);
                Ok(changed)
            }
            StoreAction::CreateParentChildLink { parent, child } => {
                let parent_node = self
                    .nodes
                    .get_mut(&parent)
                    .ok_or_else(|| StoreError::NodeNotFound(parent.clone()))?;
                let mut changed = false;
                if !parent_node.children.contains(&child) {
                    parent_node.children.push(child.clone());
                    changed = true;
                }
                let previous = match self.nodes.get_mut(&child) {
                    Some(child_node) if child_node.parent.as_ref() != Some(&parent) => {
                        changed = true;
                        child_node.parent.replace(parent)
                    }
                    _ => None,
                };
                if let Some(previous) = previous {
                    self.detach_child(&previous, &child);
                }
                Ok(changed)
            }
            StoreAction::CreatePage(page) => {
                if page.path.is_empty() {
                    return Err(StoreError::InvalidPage("page path is empty".to_string()));
                }
                if page.component.is_empty() {
                    return Err(StoreError::InvalidPage(format!(
                        "page {} has no component",
                        page.path
                    )));
                }
                let changed = self.pages.get(&page.path) != Some(&page);
                self.pages.insert(page.path.clone(), page);
                Ok(changed)
            }
            StoreAction::DeletePage { path } => Ok(self.pages.remove(&path).is_some()),
        }
    }

    fn create_node(&mut self, mut node: Node) -> Result<bool, StoreError> {
        if node.id.is_empty() {
            return Err(StoreError::InvalidNode("node id is empty".to_string()));
        }
        if node.internal.node_type.is_empty() {
            return Err(StoreError::InvalidNode(format!(
                "node {} has no internal.type",
                node.id
            )));
        }
        if node.internal.content_digest.is_none() {
            node.internal.content_digest = Some(content_digest(&node));
        }

        if let Some(existing) = self.nodes.get(&node.id) {
            if existing.internal.content_digest == node.internal.content_digest {
                // Same content: only mark it as seen in this run.
                self.touched.insert(node.id);
                return Ok(false);
            }
            if node.children.is_empty() {
                node.children = existing.children.clone();
            }
            if let Some(previous) = existing.parent.clone() {
                if node.parent.as_ref() != Some(&previous) {
                    self.detach_child(&previous, &node.id);
                }
            }
        }

        if let Some(parent_id) = node.parent.clone() {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                if !parent.children.contains(&node.id) {
                    parent.children.push(node.id.clone());
                }
            }
        }

        self.touched.insert(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(true)
    }

    /// Remove a node, detach it from its parent and delete its descendants.
    ///
    /// A listed child whose own `parent` names another node has moved and is
    /// left alone.
    fn delete_node(&mut self, id: &str) -> bool {
        let Some(root) = self.nodes.remove(id) else {
            return false;
        };
        if let Some(parent) = root.parent.as_deref() {
            self.detach_child(parent, id);
        }
        self.touched.remove(id);

        let mut pending: Vec<(NodeId, NodeId)> = root
            .children
            .into_iter()
            .map(|child| (id.to_string(), child))
            .collect();
        while let Some((parent, child)) = pending.pop() {
            let owned = match self.nodes.get(&child) {
                Some(node) => node.parent.as_ref().map_or(true, |p| *p == parent),
                None => false,
            };
            if !owned {
                continue;
            }
            if let Some(node) = self.nodes.remove(&child) {
                self.touched.remove(&child);
                pending.extend(node.children.into_iter().map(|c| (child.clone(), c)));
            }
        }
        true
    }

    fn detach_child(&mut self, parent: &str, child: &str) {
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.retain(|c| c != child);
        }
    }

    /// All nodes of one type, in id order.
    pub fn nodes_of_type<'a>(&'a self, node_type: &'a str) -> impl Iterator<Item = &'a Node> {
        self.nodes
            .values()
            .filter(move |n| n.internal.node_type == node_type)
    }
}

/// Capability to apply store actions.
///
/// The coordinator only ever talks to the store through this trait, which lets
/// tests substitute a recording fake.
pub trait ActionDispatcher {
    /// Apply one action synchronously.
    fn dispatch(&self, action: StoreAction) -> Result<(), StoreError>;

    /// Apply every action or none of them.
    fn apply_all(&self, actions: Vec<StoreAction>) -> Result<usize, StoreError>;
}

/// Thread-safe shared data store.
///
/// Readers (query runners) may hold an `Arc<DataStore>` concurrently with the
/// coordinator; writes take the lock only for the duration of one action or
/// one atomic batch.
#[derive(Debug, Default)]
pub struct DataStore {
    state: RwLock<StoreState>,
    revision: AtomicU64,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: StoreState) -> Self {
        DataStore {
            state: RwLock::new(state),
            revision: AtomicU64::new(0),
        }
    }

    /// Number of state-changing writes applied so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.state.read().nodes.get(id).cloned()
    }

    pub fn get_page(&self, path: &str) -> Option<Page> {
        self.state.read().pages.get(path).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn page_count(&self) -> usize {
        self.state.read().pages.len()
    }

    pub fn is_touched(&self, id: &str) -> bool {
        self.state.read().touched.contains(id)
    }

    /// Clone of the current contents.
    pub fn snapshot(&self) -> StoreState {
        self.state.read().clone()
    }

    /// Run a closure against the current contents under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.state.read())
    }
}

impl ActionDispatcher for DataStore {
    fn dispatch(&self, action: StoreAction) -> Result<(), StoreError> {
        let op = action.op();
        let changed = self.state.write().apply(action)?;
        if changed {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
        debug!(op = op.name(), changed, "Applied store action");
        Ok(())
    }

    fn apply_all(&self, actions: Vec<StoreAction>) -> Result<usize, StoreError> {
        let count = actions.len();
        let mut guard = self.state.write();
        let mut staged = guard.clone();
        let mut changes = 0u64;
        for action in actions {
            if staged.apply(action)? {
                changes += 1;
            }
        }
        *guard = staged;
        drop(guard);
        if changes > 0 {
            self.revision.fetch_add(changes, Ordering::AcqRel);
        }
        debug!(count, changes, "Applied store action batch");
        Ok(count)
    }
}
