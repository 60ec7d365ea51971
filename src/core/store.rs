use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::op::{OperationId, OperationKind, OptimisticOperation};

use super::ledger::{LedgerEntry, OperationLedger};

/// Why the visible value was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RollbackCause {
    /// The remote mutation failed.
    #[error("remote call failed: {0}")]
    Remote(String),
    /// No resolution arrived before the operation's timeout.
    #[error("Operation rolled back")]
    TimedOut,
    /// Every pending operation was discarded at once.
    #[error("All operations rolled back")]
    Discarded,
    /// Rollback requested without a specific cause.
    #[error("Operation rolled back")]
    Manual,
}

/// What a server refresh does while operations are pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Park the refresh until the last pending operation resolves.
    #[default]
    Defer,
    /// Replace the visible value immediately, keeping operations pending.
    Overwrite,
}

/// Callback receiving the collection value after a resolution.
pub type Hook<T> = Box<dyn FnOnce(&T) + Send>;

/// Per-call knobs for an optimistic update.
pub struct OptimisticUpdateOptions<T> {
    /// Auto-rollback window; `None` uses the operation's default.
    pub timeout: Option<Duration>,
    /// Called with the final value after a confirm.
    pub on_success: Option<Hook<T>>,
    /// Called with the restored value after a rollback.
    pub on_error: Option<Hook<T>>,
}

impl<T> Default for OptimisticUpdateOptions<T> {
    fn default() -> Self {
        Self {
            timeout: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> fmt::Debug for OptimisticUpdateOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimisticUpdateOptions")
            .field("timeout", &self.timeout)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl<T> OptimisticUpdateOptions<T> {
    /// Options with only a timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Sets the success hook.
    pub fn on_success(mut self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Sets the error hook.
    pub fn on_error(mut self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Point-in-time view of a store handed to consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticState<T> {
    /// Visible value, authoritative or speculative.
    pub data: T,
    /// True iff at least one operation is pending.
    pub is_optimistic: bool,
    /// In-flight operations in apply order.
    pub pending_operations: Vec<OptimisticOperation>,
    /// Cause of the last rollback.
    pub error: Option<RollbackCause>,
}

/// Speculative collection value with per-operation rollback.
///
/// Pure and synchronous: no I/O happens here. Every resolution is keyed by
/// operation id, so confirms and rollbacks may arrive in any order and a
/// second resolution of the same id is a no-op.
#[derive(Debug)]
pub struct OptimisticStore<T> {
    data: T,
    pending: Vec<OptimisticOperation>,
    ledger: OperationLedger<T>,
    error: Option<RollbackCause>,
    refresh_policy: RefreshPolicy,
    deferred: Option<T>,
}

impl<T: Clone> OptimisticStore<T> {
    /// Creates a store holding `data` with the default refresh policy.
    pub fn new(data: T) -> Self {
        Self::with_policy(data, RefreshPolicy::default())
    }

    /// Creates a store with an explicit refresh policy.
    pub fn with_policy(data: T, refresh_policy: RefreshPolicy) -> Self {
        Self {
            data,
            pending: Vec::new(),
            ledger: OperationLedger::new(),
            error: None,
            refresh_policy,
            deferred: None,
        }
    }

    /// Visible value.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// True iff at least one operation is pending.
    pub fn is_optimistic(&self) -> bool {
        !self.pending.is_empty()
    }

    /// In-flight operations in apply order.
    pub fn pending_operations(&self) -> &[OptimisticOperation] {
        &self.pending
    }

    /// Cause of the last rollback.
    pub fn error(&self) -> Option<&RollbackCause> {
        self.error.as_ref()
    }

    /// Server data parked by [`RefreshPolicy::Defer`].
    pub fn deferred(&self) -> Option<&T> {
        self.deferred.as_ref()
    }

    /// Clones the consumer-facing view.
    pub fn state(&self) -> OptimisticState<T> {
        OptimisticState {
            data: self.data.clone(),
            is_optimistic: self.is_optimistic(),
            pending_operations: self.pending.clone(),
            error: self.error.clone(),
        }
    }

    /// Replaces the visible value with `updated` and records an operation
    /// that can restore the current value.
    pub fn apply(
        &mut self,
        updated: T,
        kind: OperationKind,
        data: serde_json::Value,
        timeout: Option<Duration>,
    ) -> OperationId {
        self.apply_at(Instant::now(), updated, kind, data, timeout)
    }

    /// [`Self::apply`] with an explicit clock reading.
    ///
    /// A timeout too large to represent as a deadline never fires.
    pub fn apply_at(
        &mut self,
        now: Instant,
        updated: T,
        kind: OperationKind,
        data: serde_json::Value,
        timeout: Option<Duration>,
    ) -> OperationId {
        let op = OptimisticOperation::new(kind, data);
        let id = op.id.clone();
        let rollback = std::mem::replace(&mut self.data, updated);
        self.ledger.insert(
            id.clone(),
            LedgerEntry {
                rollback,
                deadline: timeout.and_then(|t| now.checked_add(t)),
            },
        );
        self.pending.push(op);
        self.error = None;
        id
    }

    /// Computes the new value from the current one and applies it.
    ///
    /// When `f` fails nothing is recorded and the store is unchanged.
    pub fn apply_with<E>(
        &mut self,
        kind: OperationKind,
        data: serde_json::Value,
        timeout: Option<Duration>,
        f: impl FnOnce(&T) -> Result<T, E>,
    ) -> Result<OperationId, E> {
        let updated = f(&self.data)?;
        Ok(self.apply(updated, kind, data, timeout))
    }

    /// Resolves `id` as successful, adopting `server_value` when given.
    ///
    /// Returns false when `id` was already resolved.
    pub fn confirm(
        &mut self,
        id: &OperationId,
        server_value: Option<T>,
        options: OptimisticUpdateOptions<T>,
    ) -> bool {
        if self.ledger.take(id).is_none() {
            return false;
        }
        self.pending.retain(|op| &op.id != id);

        if let Some(value) = server_value {
            self.data = value;
        }
        if self.pending.is_empty() {
            // The confirmed value is at least as fresh as a refresh that
            // raced it.
            self.deferred = None;
        }

        if let Some(hook) = options.on_success {
            hook(&self.data);
        }
        true
    }

    /// Like [`Self::confirm`], deriving server truth from the current value.
    ///
    /// `reconcile` only runs when `id` is still pending.
    pub fn confirm_with(
        &mut self,
        id: &OperationId,
        reconcile: impl FnOnce(&T) -> T,
        options: OptimisticUpdateOptions<T>,
    ) -> bool {
        if !self.ledger.contains(id) {
            return false;
        }
        let value = reconcile(&self.data);
        self.confirm(id, Some(value), options)
    }

    /// Resolves `id` as failed, restoring the value it replaced.
    ///
    /// Returns false when `id` was already resolved.
    pub fn rollback(
        &mut self,
        id: &OperationId,
        cause: Option<RollbackCause>,
        options: OptimisticUpdateOptions<T>,
    ) -> bool {
        let Some(entry) = self.ledger.take(id) else {
            return false;
        };
        self.pending.retain(|op| &op.id != id);

        self.data = entry.rollback;
        self.settle_deferred();
        self.error = Some(cause.unwrap_or(RollbackCause::Manual));

        if let Some(hook) = options.on_error {
            hook(&self.data);
        }
        true
    }

    /// Discards every pending operation, restoring the value from before
    /// the earliest one. Returns the discarded ids in apply order.
    pub fn rollback_all(&mut self) -> Vec<OperationId> {
        if self.pending.is_empty() {
            return Vec::new();
        }

        let ids: Vec<OperationId> = self.pending.drain(..).map(|op| op.id).collect();
        let mut entries = self.ledger.drain();
        if let Some(pos) = entries.iter().position(|(id, _)| id == &ids[0]) {
            let (_, first) = entries.swap_remove(pos);
            self.data = first.rollback;
        }
        self.settle_deferred();
        self.error = Some(RollbackCause::Discarded);
        ids
    }

    /// Accepts server truth for the whole collection.
    pub fn update_server_data(&mut self, value: T) {
        if self.pending.is_empty() {
            self.data = value;
            return;
        }
        match self.refresh_policy {
            RefreshPolicy::Defer => self.deferred = Some(value),
            RefreshPolicy::Overwrite => self.data = value,
        }
    }

    /// Clears the last rollback cause.
    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Earliest auto-rollback deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.ledger.next_deadline()
    }

    /// Rolls back every operation whose deadline has passed.
    pub fn expire_due(&mut self, now: Instant) -> Vec<OperationId> {
        let due = self.ledger.due(now);
        for id in &due {
            self.rollback(id, Some(RollbackCause::TimedOut), OptimisticUpdateOptions::default());
        }
        due
    }

    fn settle_deferred(&mut self) {
        if self.pending.is_empty() {
            if let Some(value) = self.deferred.take() {
                self.data = value;
            }
        }
    }
}
