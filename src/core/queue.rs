//! Ready-queue abstraction.

use super::record::TaskId;

/// Ordering structure that yields ids by descending priority, FIFO among
/// equal priorities.
///
/// Entries are never removed out of band: an id may outlive its pending
/// status and consumers must re-check the record after `pop`.
pub trait TaskQueue {
    /// Insert an id. Arrival order is recorded by the queue itself.
    fn push(&mut self, id: TaskId, priority: i32);
    /// Remove and return the highest-priority, earliest-pushed id.
    fn pop(&mut self) -> Option<TaskId>;
    /// Current number of entries, stale ones included.
    fn len(&self) -> usize;
    /// No entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
