//! Mutation dispatch bridge: applies a mutation event to the store immediately.

use crate::coordinator::events::MutationEvent;
use crate::error::{CoordinatorError, PayloadError};
use crate::store::{ActionDispatcher, MutationOp, StoreAction};
use tracing::{debug, warn};

/// Resolve a mutation event against the operation table.
///
/// `Ok(None)` means the operation is unknown and should be ignored.
pub fn decode_mutation(event: &MutationEvent) -> Result<Option<StoreAction>, PayloadError> {
    match MutationOp::from_name(&event.op) {
        Some(op) => op.decode(&event.payload).map(Some),
        None => Ok(None),
    }
}

/// Apply `event` to `store`.
///
/// Without a store this logs and succeeds, since the coordinator may receive
/// mutations before bootstrap binds one. Unknown operation names are ignored so
/// newer producers cannot crash the coordinator. A payload that does not fit its
/// operation is returned as a contract violation.
pub fn apply_mutation(
    event: &MutationEvent,
    store: Option<&dyn ActionDispatcher>,
) -> Result<(), CoordinatorError> {
    let Some(store) = store else {
        warn!(op = %event.op, "No store bound; mutation not applied");
        return Ok(());
    };

    match decode_mutation(event)? {
        Some(action) => {
            store.dispatch(action)?;
            Ok(())
        }
        None => {
            debug!(op = %event.op, "Ignoring unregistered mutation operation");
            Ok(())
        }
    }
}
