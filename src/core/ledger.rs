use hashbrown::HashMap;
use tokio::time::Instant;

use crate::op::OperationId;

/// Rollback bookkeeping for one in-flight operation.
#[derive(Debug, Clone)]
pub struct LedgerEntry<T> {
    /// Collection value immediately before the operation applied.
    pub rollback: T,
    /// Point after which the operation is rolled back automatically.
    pub deadline: Option<Instant>,
}

/// Side table of rollback snapshots and deadlines keyed by operation id.
///
/// Removing an entry is what cancels its timer: the runtime only ever
/// sleeps until [`OperationLedger::next_deadline`].
#[derive(Debug)]
pub struct OperationLedger<T> {
    entries: HashMap<OperationId, LedgerEntry<T>>,
}

impl<T> Default for OperationLedger<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> OperationLedger<T> {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the entry for `id`.
    pub fn insert(&mut self, id: OperationId, entry: LedgerEntry<T>) {
        self.entries.insert(id, entry);
    }

    /// Removes and returns the entry for `id`, if still pending.
    pub fn take(&mut self, id: &OperationId) -> Option<LedgerEntry<T>> {
        self.entries.remove(id)
    }

    /// Returns true when `id` has not been resolved yet.
    pub fn contains(&self, id: &OperationId) -> bool {
        self.entries.contains_key(id)
    }

    /// Borrows the entry for `id`.
    pub fn get(&self, id: &OperationId) -> Option<&LedgerEntry<T>> {
        self.entries.get(id)
    }

    /// Number of unresolved entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest deadline across all entries.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().filter_map(|e| e.deadline).min()
    }

    /// Ids whose deadline is at or before `now`, earliest first.
    pub fn due(&self, now: Instant) -> Vec<OperationId> {
        let mut due: Vec<(Instant, &OperationId)> = self
            .entries
            .iter()
            .filter_map(|(id, e)| e.deadline.filter(|d| *d <= now).map(|d| (d, id)))
            .collect();
        due.sort();
        due.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Removes every entry.
    pub fn drain(&mut self) -> Vec<(OperationId, LedgerEntry<T>)> {
        self.entries.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn due_orders_by_deadline_and_skips_untimed() {
        let now = Instant::now();
        let mut ledger = OperationLedger::new();
        ledger.insert(
            OperationId::from("late"),
            LedgerEntry { rollback: 1, deadline: Some(now + Duration::from_millis(20)) },
        );
        ledger.insert(
            OperationId::from("early"),
            LedgerEntry { rollback: 2, deadline: Some(now + Duration::from_millis(10)) },
        );
        ledger.insert(OperationId::from("never"), LedgerEntry { rollback: 3, deadline: None });

        assert_eq!(ledger.next_deadline(), Some(now + Duration::from_millis(10)));
        assert!(ledger.due(now).is_empty());
        assert_eq!(
            ledger.due(now + Duration::from_millis(30)),
            vec![OperationId::from("early"), OperationId::from("late")]
        );

        ledger.take(&OperationId::from("early"));
        assert_eq!(ledger.next_deadline(), Some(now + Duration::from_millis(20)));
        assert_eq!(ledger.len(), 2);
    }
}
