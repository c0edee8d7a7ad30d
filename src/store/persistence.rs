//! Persistence layer for the data store

use crate::error::StoreError;
use crate::store::{Node, Page, StoreState};
use crate::types::NodeId;
use std::path::Path;
use tracing::debug;

const NODE_PREFIX: &str = "node:";
const PAGE_PREFIX: &str = "page:";
const TOUCHED_KEY: &str = "meta:touched";

/// Writes store contents somewhere durable.
pub trait StatePersister: Send + Sync {
    fn persist(&self, state: &StoreState) -> Result<(), StoreError>;
}

/// Sled-backed persistence of [`StoreState`].
///
/// Nodes and pages are stored as JSON (their attribute maps are free-form);
/// the touched set is a bincode-encoded id list.
pub struct SledStatePersistence {
    db: sled::Db,
}

impl SledStatePersistence {
    /// Open (or create) the database at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| {
            StoreError::Persistence(format!("Failed to open sled database: {}", e))
        })?;
        Ok(Self { db })
    }

    /// Replace the persisted state with `state` in one atomic batch.
    pub fn save_state(&self, state: &StoreState) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();

        for item in self.db.iter().keys() {
            batch.remove(item?);
        }

        for (id, node) in &state.nodes {
            let value = serde_json::to_vec(node).map_err(|e| {
                StoreError::Persistence(format!("Failed to serialize node {}: {}", id, e))
            })?;
            batch.insert(format!("{}{}", NODE_PREFIX, id).as_bytes(), value);
        }

        for (path, page) in &state.pages {
            let value = serde_json::to_vec(page).map_err(|e| {
                StoreError::Persistence(format!("Failed to serialize page {}: {}", path, e))
            })?;
            batch.insert(format!("{}{}", PAGE_PREFIX, path).as_bytes(), value);
        }

        let touched: Vec<&NodeId> = state.touched.iter().collect();
        let touched = bincode::serialize(&touched).map_err(|e| {
            StoreError::Persistence(format!("Failed to serialize touched set: {}", e))
        })?;
        batch.insert(TOUCHED_KEY.as_bytes(), touched);

        self.db.apply_batch(batch)?;
        self.db.flush()?;
        debug!(
            nodes = state.nodes.len(),
            pages = state.pages.len(),
            "Saved store state"
        );
        Ok(())
    }

    /// Load the persisted state. An empty database yields an empty state.
    pub fn load_state(&self) -> Result<StoreState, StoreError> {
        let mut state = StoreState::new();

        for item in self.db.scan_prefix(NODE_PREFIX.as_bytes()) {
            let (_, value) = item?;
            let node: Node = serde_json::from_slice(&value).map_err(|e| {
                StoreError::Persistence(format!("Failed to deserialize node: {}", e))
            })?;
            state.nodes.insert(node.id.clone(), node);
        }

        for item in self.db.scan_prefix(PAGE_PREFIX.as_bytes()) {
            let (_, value) = item?;
            let page: Page = serde_json::from_slice(&value).map_err(|e| {
                StoreError::Persistence(format!("Failed to deserialize page: {}", e))
            })?;
            state.pages.insert(page.path.clone(), page);
        }

        if let Some(value) = self.db.get(TOUCHED_KEY.as_bytes())? {
            let touched: Vec<NodeId> = bincode::deserialize(&value).map_err(|e| {
                StoreError::Persistence(format!("Failed to deserialize touched set: {}", e))
            })?;
            state.touched = touched.into_iter().collect();
        }

        Ok(state)
    }
}

impl StatePersister for SledStatePersistence {
    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        self.save_state(state)
    }
}
