//! In-memory task store with per-status counters.
//!
//! The store is not locked on its own: the scheduler keeps it behind the
//! same mutex as the queue so a status change and its counter adjustment
//! always land in one critical section.

use std::collections::HashMap;

use super::error::SchedulerError;
use super::record::{TaskId, TaskRecord, TaskStats, TaskStatus};

/// Mapping id -> record plus counters that always match the records.
pub struct TaskStore<P> {
    records: HashMap<TaskId, TaskRecord<P>>,
    counts: TaskStats,
}

impl<P> Default for TaskStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> TaskStore<P> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            counts: TaskStats::default(),
        }
    }

    /// Insert a pending record under a fresh id.
    pub fn create(&mut self, payload: P, priority: i32) -> TaskId {
        let mut id = TaskId::new();
        while self.records.contains_key(&id) {
            id = TaskId::new();
        }
        self.records.insert(id, TaskRecord::new(id, payload, priority));
        self.counts.pending += 1;
        id
    }

    /// Snapshot of a record.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent.
    pub fn get(&self, id: TaskId) -> Result<TaskRecord<P>, SchedulerError> {
        self.records
            .get(&id)
            .cloned()
            .ok_or(SchedulerError::NotFound(id))
    }

    /// Borrow a record without cloning.
    #[must_use]
    pub fn peek(&self, id: TaskId) -> Option<&TaskRecord<P>> {
        self.records.get(&id)
    }

    /// Atomic read-modify-write.
    ///
    /// `f` works on a copy; the copy replaces the stored record and the
    /// counters follow the status change only when `f` returns `Ok`.
    /// `updated_at_ms` is refreshed on commit.
    ///
    /// # Errors
    ///
    /// `NotFound` if the id is absent, or whatever `f` returns.
    pub fn mutate<T, F>(&mut self, id: TaskId, f: F) -> Result<T, SchedulerError>
    where
        F: FnOnce(&mut TaskRecord<P>) -> Result<T, SchedulerError>,
    {
        let stored = self
            .records
            .get_mut(&id)
            .ok_or(SchedulerError::NotFound(id))?;
        let mut draft = stored.clone();
        let out = f(&mut draft)?;
        draft.id = stored.id;
        draft.priority = stored.priority;
        draft.created_at_ms = stored.created_at_ms;
        draft.touch();
        self.counts.shift(stored.status, draft.status);
        *stored = draft;
        Ok(out)
    }

    /// Remove a record, decrementing the counter of its status.
    pub fn delete(&mut self, id: TaskId) -> Option<TaskRecord<P>> {
        let record = self.records.remove(&id)?;
        *self.counts.slot_mut(record.status) -= 1;
        Some(record)
    }

    /// Ids of every record currently in `status`.
    #[must_use]
    pub fn ids_with_status(&self, status: TaskStatus) -> Vec<TaskId> {
        self.records
            .values()
            .filter(|r| r.status == status)
            .map(|r| r.id)
            .collect()
    }

    /// Counter snapshot.
    #[must_use]
    pub const fn counts(&self) -> TaskStats {
        self.counts
    }

    /// Counts rebuilt from the records themselves, O(n).
    #[must_use]
    pub fn recount(&self) -> TaskStats {
        let mut stats = TaskStats::default();
        for record in self.records.values() {
            *stats.slot_mut(record.status) += 1;
        }
        stats
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No live records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_counts_pending() {
        let mut store = TaskStore::new();
        let a = store.create("a", 1);
        let b = store.create("b", 1);
        assert_ne!(a, b);
        assert_eq!(store.counts().pending, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(*store.get(a).unwrap().payload, "a");
    }

    #[test]
    fn test_mutate_moves_counters() {
        let mut store = TaskStore::new();
        let id = store.create((), 1);
        store
            .mutate(id, |r| {
                r.status = TaskStatus::Processing;
                Ok(())
            })
            .unwrap();
        let counts = store.counts();
        assert_eq!(counts.pending, 0);
        assert_eq!(counts.processing, 1);
    }

    #[test]
    fn test_failed_mutate_changes_nothing() {
        let mut store = TaskStore::new();
        let id = store.create((), 1);
        let before = store.get(id).unwrap();
        let err = store
            .mutate(id, |r| -> Result<(), SchedulerError> {
                r.status = TaskStatus::Completed;
                r.progress = 77;
                Err(SchedulerError::InvalidArgument("rejected".into()))
            })
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidArgument(_)));
        let after = store.get(id).unwrap();
        assert_eq!(after.status, TaskStatus::Pending);
        assert_eq!(after.progress, 0);
        assert_eq!(after.updated_at_ms, before.updated_at_ms);
        assert_eq!(store.counts().pending, 1);
    }

    #[test]
    fn test_missing_id() {
        let mut store: TaskStore<()> = TaskStore::new();
        let id = TaskId::new();
        assert_eq!(store.get(id).unwrap_err(), SchedulerError::NotFound(id));
        assert_eq!(
            store.mutate(id, |_| Ok(())).unwrap_err(),
            SchedulerError::NotFound(id)
        );
        assert!(store.delete(id).is_none());
    }

    #[test]
    fn test_delete_decrements() {
        let mut store = TaskStore::new();
        let id = store.create(0_u8, 1);
        assert!(store.delete(id).is_some());
        assert!(store.is_empty());
        assert_eq!(store.counts(), TaskStats::default());
    }
}
