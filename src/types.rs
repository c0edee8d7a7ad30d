//! Shared identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a content node in the data store.
pub type NodeId = String;

/// Identifier of a generated page (its path).
pub type PageId = String;

/// Binding epoch of a store reference.
///
/// Bumped every time a coordinator binds a store, so anything derived from a
/// previous binding (such as a query runner) can tell it is stale without
/// comparing pointers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StoreEpoch(u64);

impl StoreEpoch {
    pub fn new(value: u64) -> Self {
        StoreEpoch(value)
    }

    pub fn next(self) -> Self {
        StoreEpoch(self.0 + 1)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StoreEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
