//! Priority task scheduler enforcing the task lifecycle.
//!
//! A single `parking_lot::Mutex` guards the store and the ready queue
//! together. Every public operation takes it exactly once, does bounded
//! in-memory work and releases it, so counters can never drift from the
//! records they describe.
//!
//! The queue uses lazy deletion: ids stay queued after their record leaves
//! `pending` (claimed through `set_status`, failed, reaped) and `next_batch`
//! discards them when they surface. A task failed straight from `pending`
//! keeps its original entry; once retried it may sit in the queue twice,
//! and whichever entry surfaces first claims it at that entry's position.
//!
//! Because nothing purges stale entries eagerly, a single `next_batch(n)`
//! pops at most `scan_factor * n` entries; a batch can come back short while
//! ready tasks still sit deeper in the queue, and the next call continues
//! from there.

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::error::SchedulerError;
use super::queue::TaskQueue;
use super::record::{TaskId, TaskRecord, TaskStats, TaskStatus};
use super::store::TaskStore;
use crate::config::SchedulerConfig;
use crate::infra::queue::InMemoryQueue;

struct SchedulerState<P, Q> {
    store: TaskStore<P>,
    queue: Q,
}

/// Owns a task store and a ready queue and exposes the task lifecycle.
///
/// Share it between submitters and workers through an `Arc`.
pub struct TaskScheduler<P, Q = InMemoryQueue> {
    config: SchedulerConfig,
    state: Mutex<SchedulerState<P, Q>>,
}

impl<P> TaskScheduler<P, InMemoryQueue> {
    /// Scheduler with default configuration and an in-memory queue.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SchedulerConfig::default(), InMemoryQueue::new())
    }

    /// Scheduler with the given configuration and an in-memory queue.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the configuration does not validate.
    pub fn with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_queue(config, InMemoryQueue::new())
    }
}

impl<P> Default for TaskScheduler<P, InMemoryQueue> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, Q: TaskQueue> TaskScheduler<P, Q> {
    /// Scheduler over a caller-provided queue backend.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the configuration does not validate.
    pub fn with_queue(config: SchedulerConfig, queue: Q) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidArgument)?;
        Ok(Self::build(config, queue))
    }

    fn build(config: SchedulerConfig, queue: Q) -> Self {
        Self {
            config,
            state: Mutex::new(SchedulerState {
                store: TaskStore::new(),
                queue,
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Create a pending task and queue it. Does not wait for processing.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a negative priority.
    pub fn submit(&self, payload: P, priority: i32) -> Result<TaskId, SchedulerError> {
        if priority < 0 {
            return Err(SchedulerError::InvalidArgument(format!(
                "priority must not be negative, got {priority}"
            )));
        }
        let mut state = self.state.lock();
        let id = state.store.create(payload, priority);
        state.queue.push(id, priority);
        drop(state);
        debug!(task_id = %id, priority, "task submitted");
        Ok(id)
    }

    /// [`submit`](Self::submit) with the configured default priority.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the configured default is negative.
    pub fn submit_default(&self, payload: P) -> Result<TaskId, SchedulerError> {
        self.submit(payload, self.config.default_priority)
    }

    /// Claim up to `max_size` ready tasks, moving each to `processing`.
    ///
    /// Never blocks and never fails: an empty or short batch just means
    /// nothing more was ready within the scan bound.
    pub fn next_batch(&self, max_size: usize) -> Vec<TaskId> {
        if max_size == 0 {
            return Vec::new();
        }
        let mut guard = self.state.lock();
        let SchedulerState { store, queue } = &mut *guard;

        let scan_limit = max_size
            .saturating_mul(self.config.scan_factor)
            .min(queue.len());
        let mut batch = Vec::with_capacity(max_size.min(scan_limit));
        let mut scanned = 0;
        let mut stale = 0;

        while batch.len() < max_size && scanned < scan_limit {
            let Some(id) = queue.pop() else { break };
            scanned += 1;

            let ready = store
                .peek(id)
                .is_some_and(|r| r.status == TaskStatus::Pending);
            if !ready {
                stale += 1;
                continue;
            }
            let claimed = store.mutate(id, |r| {
                r.status = TaskStatus::Processing;
                Ok(())
            });
            if claimed.is_ok() {
                batch.push(id);
            }
        }
        drop(guard);

        if stale > 0 {
            trace!(stale, scanned, "discarded stale queue entries");
        }
        if !batch.is_empty() {
            debug!(claimed = batch.len(), requested = max_size, "batch claimed");
        }
        batch
    }

    /// [`next_batch`](Self::next_batch) with the configured batch size.
    pub fn next_default_batch(&self) -> Vec<TaskId> {
        self.next_batch(self.config.batch_size)
    }

    /// Store progress, clamped to `0..=100`. Allowed in any status.
    /// Returns the stored value.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn report_progress(&self, id: TaskId, value: i64) -> Result<u8, SchedulerError> {
        let pct = u8::try_from(value.clamp(0, 100)).unwrap_or(100);
        self.state.lock().store.mutate(id, |r| {
            r.progress = pct;
            Ok(pct)
        })
    }

    /// Move a task along one edge of the state machine.
    ///
    /// `failed -> pending` behaves exactly like [`retry`](Self::retry) so
    /// a pending task always has a queue entry.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidTransition` for anything that
    /// is not an edge.
    pub fn set_status(&self, id: TaskId, new_status: TaskStatus) -> Result<(), SchedulerError> {
        let mut guard = self.state.lock();
        if new_status == TaskStatus::Pending {
            return Self::retry_locked(&mut guard, id);
        }
        let result = guard.store.mutate(id, |r| {
            if !r.status.can_transition_to(new_status) {
                return Err(SchedulerError::InvalidTransition {
                    from: r.status,
                    to: new_status,
                });
            }
            r.status = new_status;
            Ok(())
        });
        drop(guard);
        match &result {
            Ok(()) => debug!(task_id = %id, status = %new_status, "task status updated"),
            Err(e) => warn!(task_id = %id, error = %e, "status update rejected"),
        }
        result
    }

    /// Fail a processing task with `message`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidTransition` unless the task is
    /// currently `processing`.
    pub fn report_error(&self, id: TaskId, message: impl Into<String>) -> Result<(), SchedulerError> {
        let message = message.into();
        let result = self.state.lock().store.mutate(id, |r| {
            if r.status != TaskStatus::Processing {
                return Err(SchedulerError::InvalidTransition {
                    from: r.status,
                    to: TaskStatus::Failed,
                });
            }
            r.status = TaskStatus::Failed;
            r.error = Some(message.clone());
            Ok(())
        });
        match &result {
            Ok(()) => debug!(task_id = %id, error = %message, "task failed"),
            Err(e) => warn!(task_id = %id, error = %e, "error report rejected"),
        }
        result
    }

    /// Return a failed task to the queue under its original priority.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidTransition` unless the task is
    /// currently `failed`.
    pub fn retry(&self, id: TaskId) -> Result<(), SchedulerError> {
        let mut guard = self.state.lock();
        Self::retry_locked(&mut guard, id)
    }

    fn retry_locked(state: &mut SchedulerState<P, Q>, id: TaskId) -> Result<(), SchedulerError> {
        let result = state.store.mutate(id, |r| {
            if r.status != TaskStatus::Failed {
                return Err(SchedulerError::InvalidTransition {
                    from: r.status,
                    to: TaskStatus::Pending,
                });
            }
            r.status = TaskStatus::Pending;
            r.error = None;
            r.retry_count = r.retry_count.saturating_add(1);
            Ok((r.priority, r.retry_count))
        });
        match result {
            Ok((priority, retry_count)) => {
                state.queue.push(id, priority);
                debug!(task_id = %id, retry_count, "task requeued");
                Ok(())
            }
            Err(e) => {
                warn!(task_id = %id, error = %e, "retry rejected");
                Err(e)
            }
        }
    }

    /// Delete every completed record. Returns how many were removed.
    pub fn reap_completed(&self) -> usize {
        let mut guard = self.state.lock();
        let ids = guard.store.ids_with_status(TaskStatus::Completed);
        let reaped = ids
            .into_iter()
            .filter(|id| guard.store.delete(*id).is_some())
            .count();
        drop(guard);
        if reaped > 0 {
            debug!(reaped, "completed tasks reaped");
        }
        reaped
    }

    /// Per-status counters, O(1).
    pub fn stats(&self) -> TaskStats {
        self.state.lock().store.counts()
    }

    /// Per-status counts rebuilt by scanning every record, O(n). Always
    /// equal to [`stats`](Self::stats); exposed for consistency checks.
    pub fn recount(&self) -> TaskStats {
        self.state.lock().store.recount()
    }

    /// Snapshot of one record.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn get(&self, id: TaskId) -> Result<TaskRecord<P>, SchedulerError> {
        self.state.lock().store.get(id)
    }

    /// Current status.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn status(&self, id: TaskId) -> Result<TaskStatus, SchedulerError> {
        self.read(id, |r| r.status)
    }

    /// Current progress.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn progress(&self, id: TaskId) -> Result<u8, SchedulerError> {
        self.read(id, |r| r.progress)
    }

    /// Failure message, if failed.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn error(&self, id: TaskId) -> Result<Option<String>, SchedulerError> {
        self.read(id, |r| r.error.clone())
    }

    /// Number of retries so far.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub fn retry_count(&self, id: TaskId) -> Result<u32, SchedulerError> {
        self.read(id, |r| r.retry_count)
    }

    fn read<T>(&self, id: TaskId, f: impl FnOnce(&TaskRecord<P>) -> T) -> Result<T, SchedulerError> {
        self.state
            .lock()
            .store
            .peek(id)
            .map(f)
            .ok_or(SchedulerError::NotFound(id))
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    /// No live records.
    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }

    /// Queue entries, stale ones included.
    pub fn queue_depth(&self) -> usize {
        self.state.lock().queue.len()
    }
}
