//! Optimistic mutation engine: operation ledger and store.

/// Rollback snapshots and deadlines keyed by operation id.
pub mod ledger;
/// Speculative collection value with apply/confirm/rollback transitions.
pub mod store;
