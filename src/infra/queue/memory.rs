//! In-memory priority queue of task ids.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::{TaskId, TaskQueue};

/// Heap entry ordered by priority (highest first), then by push sequence
/// (lowest first).
#[derive(Debug)]
struct QueueEntry {
    priority: i32,
    seq: u64,
    id: TaskId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: larger priority wins, then the smaller sequence.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Binary-heap queue with O(log n) push and pop.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    entries: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl InMemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Id that the next `pop` would return.
    #[must_use]
    pub fn peek(&self) -> Option<TaskId> {
        self.entries.peek().map(|e| e.id)
    }
}

impl TaskQueue for InMemoryQueue {
    fn push(&mut self, id: TaskId, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(QueueEntry { priority, seq, id });
    }

    fn pop(&mut self) -> Option<TaskId> {
        self.entries.pop().map(|e| e.id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
