//! Core scheduling abstractions: records, store, queue seam and scheduler.

pub mod error;
pub mod queue;
pub mod record;
pub mod scheduler;
pub mod store;

pub use error::{AppResult, ErrorCode, SchedulerError};
pub use queue::TaskQueue;
pub use record::{TaskId, TaskRecord, TaskStats, TaskStatus, DEFAULT_PRIORITY};
pub use scheduler::TaskScheduler;
pub use store::TaskStore;
