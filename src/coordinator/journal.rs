//! Batch Journal
//!
//! Holds the batch being flushed so an interrupted flush can be recovered. The
//! mutation batch is stored as JSON (its arguments are free-form); the pending
//! page sets and dirty flags as a bincode record. Both keys are written and
//! cleared inside one sled transaction.

use crate::coordinator::events::MutationEvent;
use crate::error::CoordinatorError;
use crate::types::PageId;
use serde::{Deserialize, Serialize};
use sled::transaction::TransactionResult;
use std::path::Path;
use tracing::debug;

const JOURNAL_TREE: &str = "journal";
const BATCH_KEY: &[u8] = b"batch";
const PENDING_KEY: &[u8] = b"pending";

/// Page sets and flags captured alongside the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPages {
    pub pages_to_build: Vec<PageId>,
    pub pages_to_delete: Vec<PageId>,
    pub files_dirty: bool,
    pub nodes_dirty: bool,
}

/// A journaled flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JournalEntry {
    pub batch: Vec<MutationEvent>,
    pub pending: PendingPages,
}

/// Durable record of the flush in progress.
pub trait FlushJournal: Send {
    /// Record `entry`, replacing whatever was journaled before.
    fn record(&self, entry: &JournalEntry) -> Result<(), CoordinatorError>;

    /// Remove the journaled entry.
    fn clear(&self) -> Result<(), CoordinatorError>;

    /// The journaled entry, if a flush was interrupted.
    fn load(&self) -> Result<Option<JournalEntry>, CoordinatorError>;
}

/// Sled-backed journal of the in-flight flush.
pub struct BatchJournal {
    db: sled::Db,
    tree: sled::Tree,
}

impl BatchJournal {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoordinatorError> {
        let db = sled::open(path).map_err(|e| {
            CoordinatorError::Journal(format!("Failed to open journal database: {}", e))
        })?;
        let tree = db.open_tree(JOURNAL_TREE).map_err(|e| {
            CoordinatorError::Journal(format!("Failed to open journal tree: {}", e))
        })?;
        Ok(Self { db, tree })
    }

    /// Record `entry`, replacing whatever was journaled before.
    pub fn record(&self, entry: &JournalEntry) -> Result<(), CoordinatorError> {
        let batch = serde_json::to_vec(&entry.batch).map_err(|e| {
            CoordinatorError::Journal(format!("Failed to serialize batch: {}", e))
        })?;
        let pending = bincode::serialize(&entry.pending).map_err(|e| {
            CoordinatorError::Journal(format!("Failed to serialize pending pages: {}", e))
        })?;

        let result: TransactionResult<()> = self.tree.transaction(|tx| {
            tx.insert(BATCH_KEY, batch.as_slice())?;
            tx.insert(PENDING_KEY, pending.as_slice())?;
            Ok(())
        });
        result.map_err(|e| CoordinatorError::Journal(format!("Failed to write journal: {:?}", e)))?;
        self.sync()?;
        debug!(mutations = entry.batch.len(), "Journaled batch");
        Ok(())
    }

    /// Remove the journaled entry.
    pub fn clear(&self) -> Result<(), CoordinatorError> {
        let result: TransactionResult<()> = self.tree.transaction(|tx| {
            tx.remove(BATCH_KEY)?;
            tx.remove(PENDING_KEY)?;
            Ok(())
        });
        result.map_err(|e| CoordinatorError::Journal(format!("Failed to clear journal: {:?}", e)))?;
        self.sync()
    }

    /// The journaled entry, if a flush was interrupted.
    pub fn load(&self) -> Result<Option<JournalEntry>, CoordinatorError> {
        let read_err = |e: sled::Error| CoordinatorError::Journal(format!("Failed to read journal: {}", e));

        let Some(batch) = self.tree.get(BATCH_KEY).map_err(read_err)? else {
            return Ok(None);
        };
        let batch: Vec<MutationEvent> = serde_json::from_slice(&batch).map_err(|e| {
            CoordinatorError::Journal(format!("Failed to deserialize batch: {}", e))
        })?;

        let pending = match self.tree.get(PENDING_KEY).map_err(read_err)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(|e| {
                CoordinatorError::Journal(format!("Failed to deserialize pending pages: {}", e))
            })?,
            None => PendingPages::default(),
        };

        Ok(Some(JournalEntry { batch, pending }))
    }

    fn sync(&self) -> Result<(), CoordinatorError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| CoordinatorError::Journal(format!("Failed to flush journal: {}", e)))
    }
}

impl FlushJournal for BatchJournal {
    fn record(&self, entry: &JournalEntry) -> Result<(), CoordinatorError> {
        BatchJournal::record(self, entry)
    }

    fn clear(&self) -> Result<(), CoordinatorError> {
        BatchJournal::clear(self)
    }

    fn load(&self) -> Result<Option<JournalEntry>, CoordinatorError> {
        BatchJournal::load(self)
    }
}
