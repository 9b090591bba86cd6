//! Task record, identifiers and the lifecycle state machine.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::clock::now_ms;

/// Priority assigned when the caller does not pick one.
pub const DEFAULT_PRIORITY: i32 = 1;

/// Opaque, never-reused task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Status of a task in the scheduler lifecycle.
///
/// Legal edges:
/// - Pending -> Processing -> Completed
/// - Pending -> Failed, Processing -> Failed
/// - Failed -> Pending (retry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the queue to be claimed.
    Pending,
    /// Claimed by a worker.
    Processing,
    /// Finished successfully.
    Completed,
    /// Failed; stays here until retried.
    Failed,
}

impl TaskStatus {
    /// Every status, in counter order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Processing, Self::Completed, Self::Failed];

    /// Whether `self -> next` is an edge of the state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Failed)
                | (Self::Processing, Self::Completed | Self::Failed)
                | (Self::Failed, Self::Pending)
        )
    }

    /// Completed or failed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Lowercase name used in logs and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown task status `{s}`"))
    }
}

/// One unit of work and its lifecycle metadata.
///
/// The payload sits behind an `Arc` so snapshots handed to callers are cheap
/// and never expose the stored record to mutation.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "P: Serialize"))]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub struct TaskRecord<P> {
    /// Unique task identifier.
    pub id: TaskId,
    /// Caller-supplied work description; never inspected.
    pub payload: Arc<P>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Queue priority, higher first. Fixed at creation.
    pub priority: i32,
    /// Number of times the task went from failed back to pending.
    pub retry_count: u32,
    /// Progress percentage in `0..=100`.
    pub progress: u8,
    /// Failure message while failed.
    pub error: Option<String>,
    /// Creation time in milliseconds since epoch.
    pub created_at_ms: u64,
    /// Last mutation time in milliseconds since epoch.
    pub updated_at_ms: u64,
}

impl<P> TaskRecord<P> {
    /// Build a fresh pending record.
    pub fn new(id: TaskId, payload: P, priority: i32) -> Self {
        let now = now_ms();
        Self {
            id,
            payload: Arc::new(payload),
            status: TaskStatus::Pending,
            priority,
            retry_count: 0,
            progress: 0,
            error: None,
            created_at_ms: now,
            updated_at_ms: now,
        }
    }

    /// Refresh `updated_at_ms`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at_ms = now_ms().max(self.updated_at_ms);
    }
}

// Manual impl: `P` itself need not be `Clone`.
impl<P> Clone for TaskRecord<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            payload: Arc::clone(&self.payload),
            status: self.status,
            priority: self.priority,
            retry_count: self.retry_count,
            progress: self.progress,
            error: self.error.clone(),
            created_at_ms: self.created_at_ms,
            updated_at_ms: self.updated_at_ms,
        }
    }
}

/// Snapshot of the per-status counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Tasks waiting to be claimed.
    pub pending: usize,
    /// Tasks claimed by workers.
    pub processing: usize,
    /// Tasks finished successfully and not yet reaped.
    pub completed: usize,
    /// Tasks that failed and were not retried.
    pub failed: usize,
}

impl TaskStats {
    /// Sum over all statuses.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }

    /// Counter for one status.
    #[must_use]
    pub const fn get(&self, status: TaskStatus) -> usize {
        match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::Processing => self.processing,
            TaskStatus::Completed => self.completed,
            TaskStatus::Failed => self.failed,
        }
    }

    pub(crate) fn slot_mut(&mut self, status: TaskStatus) -> &mut usize {
        match status {
            TaskStatus::Pending => &mut self.pending,
            TaskStatus::Processing => &mut self.processing,
            TaskStatus::Completed => &mut self.completed,
            TaskStatus::Failed => &mut self.failed,
        }
    }

    pub(crate) fn shift(&mut self, from: TaskStatus, to: TaskStatus) {
        if from != to {
            *self.slot_mut(from) -= 1;
            *self.slot_mut(to) += 1;
        }
    }
}
