//! Registered mutation operations.
//!
//! Mutation events name an operation by its camelCase name and carry positional
//! JSON arguments. [`MutationOp::from_name`] is the lookup table; names it does
//! not know are unknown operations and are ignored by the caller.
//! [`MutationOp::decode`] turns the positional arguments into a typed
//! [`StoreAction`] or reports a [`PayloadError`].

use crate::error::PayloadError;
use crate::store::{Node, Page};
use crate::types::{NodeId, PageId};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Operations the store knows how to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationOp {
    CreateNode,
    DeleteNode,
    TouchNode,
    CreateNodeField,
    CreateParentChildLink,
    CreatePage,
    DeletePage,
}

impl MutationOp {
    pub const ALL: [MutationOp; 7] = [
        MutationOp::CreateNode,
        MutationOp::DeleteNode,
        MutationOp::TouchNode,
        MutationOp::CreateNodeField,
        MutationOp::CreateParentChildLink,
        MutationOp::CreatePage,
        MutationOp::DeletePage,
    ];

    /// Look up an operation by its registered name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            MutationOp::CreateNode => "createNode",
            MutationOp::DeleteNode => "deleteNode",
            MutationOp::TouchNode => "touchNode",
            MutationOp::CreateNodeField => "createNodeField",
            MutationOp::CreateParentChildLink => "createParentChildLink",
            MutationOp::CreatePage => "createPage",
            MutationOp::DeletePage => "deletePage",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            MutationOp::CreateNode => "a node object with id and internal.type",
            MutationOp::DeleteNode | MutationOp::TouchNode => "a node or {id}",
            MutationOp::CreateNodeField => "{node, name, value}",
            MutationOp::CreateParentChildLink => "{parent, child}",
            MutationOp::CreatePage => "a page object with path and component",
            MutationOp::DeletePage => "a page or {path}",
        }
    }

    /// Decode positional arguments into a typed action.
    ///
    /// The first argument is the operation's input. `createNode` also accepts an
    /// optional plugin descriptor `{name}` as its second argument, recorded as the
    /// node's owner when the node does not name one. Further arguments are ignored.
    pub fn decode(self, payload: &[Value]) -> Result<StoreAction, PayloadError> {
        match self {
            MutationOp::CreateNode => {
                let mut node: Node = self.first_arg(payload)?;
                if node.internal.owner.is_none() {
                    if let Some(plugin) = payload.get(1).filter(|v| !v.is_null()) {
                        let plugin: PluginRef = self.parse(plugin.clone())?;
                        node.internal.owner = Some(plugin.name);
                    }
                }
                Ok(StoreAction::CreateNode(node))
            }
            MutationOp::DeleteNode => {
                let node: NodeRef = self.first_arg(payload)?;
                Ok(StoreAction::DeleteNode { id: node.id })
            }
            MutationOp::TouchNode => {
                let node: NodeRef = self.first_arg(payload)?;
                Ok(StoreAction::TouchNode { id: node.id })
            }
            MutationOp::CreateNodeField => {
                let args: NodeFieldArgs = self.first_arg(payload)?;
                Ok(StoreAction::CreateNodeField {
                    node_id: args.node.id,
                    name: args.name,
                    value: args.value,
                })
            }
            MutationOp::CreateParentChildLink => {
                let args: ParentChildArgs = self.first_arg(payload)?;
                Ok(StoreAction::CreateParentChildLink {
                    parent: args.parent.id,
                    child: args.child.id,
                })
            }
            MutationOp::CreatePage => Ok(StoreAction::CreatePage(self.first_arg(payload)?)),
            MutationOp::DeletePage => {
                let page: PageRef = self.first_arg(payload)?;
                Ok(StoreAction::DeletePage { path: page.path })
            }
        }
    }

    fn first_arg<T: DeserializeOwned>(self, payload: &[Value]) -> Result<T, PayloadError> {
        let first = payload.first().ok_or_else(|| PayloadError {
            op: self.name(),
            expected: self.expected(),
            reason: "payload is empty".to_string(),
        })?;
        self.parse(first.clone())
    }

    fn parse<T: DeserializeOwned>(self, value: Value) -> Result<T, PayloadError> {
        serde_json::from_value(value).map_err(|e| PayloadError {
            op: self.name(),
            expected: self.expected(),
            reason: e.to_string(),
        })
    }
}

/// A typed store mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    CreateNode(Node),
    DeleteNode {
        id: NodeId,
    },
    TouchNode {
        id: NodeId,
    },
    CreateNodeField {
        node_id: NodeId,
        name: String,
        value: Value,
    },
    CreateParentChildLink {
        parent: NodeId,
        child: NodeId,
    },
    CreatePage(Page),
    DeletePage {
        path: PageId,
    },
}

impl StoreAction {
    pub fn op(&self) -> MutationOp {
        match self {
            StoreAction::CreateNode(_) => MutationOp::CreateNode,
            StoreAction::DeleteNode { .. } => MutationOp::DeleteNode,
            StoreAction::TouchNode { .. } => MutationOp::TouchNode,
            StoreAction::CreateNodeField { .. } => MutationOp::CreateNodeField,
            StoreAction::CreateParentChildLink { .. } => MutationOp::CreateParentChildLink,
            StoreAction::CreatePage(_) => MutationOp::CreatePage,
            StoreAction::DeletePage { .. } => MutationOp::DeletePage,
        }
    }
}

#[derive(Deserialize)]
struct NodeRef {
    #[serde(alias = "nodeId")]
    id: NodeId,
}

#[derive(Deserialize)]
struct PageRef {
    path: PageId,
}

#[derive(Deserialize)]
struct PluginRef {
    name: String,
}

#[derive(Deserialize)]
struct NodeFieldArgs {
    node: NodeRef,
    name: String,
    value: Value,
}

#[derive(Deserialize)]
struct ParentChildArgs {
    parent: NodeRef,
    child: NodeRef,
}
