//! Runtime event stream payloads.

use crate::{
    core::store::RollbackCause,
    op::{OperationId, OperationKind},
};

/// Events emitted from a collection's single-writer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// An optimistic value became visible.
    Applied {
        /// New operation id.
        id: OperationId,
        /// Domain tag of the operation.
        kind: OperationKind,
    },
    /// An operation was confirmed.
    Confirmed {
        /// Confirmed operation id.
        id: OperationId,
    },
    /// An operation was rolled back by its caller.
    RolledBack {
        /// Rolled back operation id.
        id: OperationId,
        /// Recorded cause.
        cause: RollbackCause,
    },
    /// An operation hit its timeout and was rolled back.
    TimedOut {
        /// Expired operation id.
        id: OperationId,
    },
    /// Every pending operation was discarded.
    RolledBackAll {
        /// Discarded ids in apply order.
        ids: Vec<OperationId>,
    },
    /// Server truth arrived.
    ServerData {
        /// True when parked until pending operations resolve.
        deferred: bool,
    },
    /// The last rollback cause was cleared.
    ErrorCleared,
}
