//! Bound Query Runner
//!
//! A [`QueryRunner`] is a query-execution handle closed over one store reference.
//! It is produced by the coordinator's binder and remembers the [`StoreEpoch`] it
//! was bound at, so the coordinator can tell when it must be rebuilt.

use crate::error::QueryError;
use crate::reporter::Reporter;
use crate::store::{DataStore, Node, Page};
use crate::types::StoreEpoch;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Sort by a dotted field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// Node selection.
///
/// `filter` maps dotted field paths (e.g. `fields.slug`, `internal.owner`) to the
/// value they must equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeQuery {
    #[serde(default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub filter: BTreeMap<String, Value>,
    #[serde(default)]
    pub sort: Option<SortSpec>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl NodeQuery {
    pub fn of_type(node_type: impl Into<String>) -> Self {
        NodeQuery {
            node_type: Some(node_type.into()),
            ..Default::default()
        }
    }

    pub fn filter(mut self, path: impl Into<String>, value: Value) -> Self {
        self.filter.insert(path.into(), value);
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            order,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn validate(&self) -> Result<(), QueryError> {
        if let Some(path) = self.filter.keys().find(|p| !is_valid_path(p)) {
            return Err(QueryError::InvalidQuery(format!(
                "invalid filter path '{}'",
                path
            )));
        }
        if let Some(sort) = &self.sort {
            if !is_valid_path(&sort.field) {
                return Err(QueryError::InvalidQuery(format!(
                    "invalid sort field '{}'",
                    sort.field
                )));
            }
        }
        Ok(())
    }
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|segment| !segment.is_empty())
}

/// Query output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub nodes: Vec<Value>,
    /// Store revision the query observed.
    pub revision: u64,
}

/// Query-execution handle bound to one store.
#[derive(Clone)]
pub struct QueryRunner {
    store: Arc<DataStore>,
    epoch: StoreEpoch,
    reporter: Arc<dyn Reporter>,
}

impl fmt::Debug for QueryRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRunner")
            .field("epoch", &self.epoch)
            .field("revision", &self.store.revision())
            .finish()
    }
}

impl QueryRunner {
    /// Bind a runner to `store` at `epoch`.
    pub fn bind(store: Arc<DataStore>, epoch: StoreEpoch, reporter: Arc<dyn Reporter>) -> Self {
        debug!(epoch = %epoch, "Binding query runner");
        QueryRunner {
            store,
            epoch,
            reporter,
        }
    }

    /// Epoch of the store binding this runner closes over.
    pub fn epoch(&self) -> StoreEpoch {
        self.epoch
    }

    /// True if this runner was bound to exactly this store instance.
    pub fn is_bound_to(&self, store: &Arc<DataStore>) -> bool {
        Arc::ptr_eq(&self.store, store)
    }

    /// Execute a node query.
    pub fn run(&self, query: &NodeQuery) -> Result<QueryResult, QueryError> {
        query.validate()?;

        let (mut nodes, revision) = self.store.read(|state| {
            let candidates: Vec<Value> = match &query.node_type {
                Some(node_type) => state.nodes_of_type(node_type).map(Node::to_json).collect(),
                None => state.nodes.values().map(Node::to_json).collect(),
            };
            (candidates, self.store.revision())
        });

        if nodes.is_empty() {
            if let Some(node_type) = &query.node_type {
                self.reporter.warn(&format!(
                    "Query for node type '{}' matched no nodes in the store",
                    node_type
                ));
            }
        }

        nodes.retain(|node| {
            query
                .filter
                .iter()
                .all(|(path, expected)| lookup(node, path) == Some(expected))
        });

        if let Some(sort) = &query.sort {
            nodes.sort_by(|a, b| {
                let ordering = compare_values(lookup(a, &sort.field), lookup(b, &sort.field));
                match sort.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            nodes.truncate(limit);
        }

        Ok(QueryResult { nodes, revision })
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.store.get_node(id)
    }

    pub fn nodes_of_type(&self, node_type: &str) -> Vec<Node> {
        self.store
            .read(|state| state.nodes_of_type(node_type).cloned().collect())
    }

    pub fn page(&self, path: &str) -> Option<Page> {
        self.store.get_page(path)
    }
}

/// Resolve a dotted path inside a JSON value.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// Total order over optional JSON values: missing and null first, then booleans,
/// numbers, strings, and everything else by its serialized form.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => match rank(a).cmp(&rank(b)) {
            Ordering::Equal => {
                let x = a.map(Value::to_string).unwrap_or_default();
                let y = b.map(Value::to_string).unwrap_or_default();
                x.cmp(&y)
            }
            other => other,
        },
    }
}
