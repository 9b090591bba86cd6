//! # Media Task Scheduler
//!
//! Priority scheduling and lifecycle tracking for a media processing
//! pipeline. Each task describes one external resource to download,
//! transform and publish; this crate decides which task runs next, tracks
//! it through `pending -> processing -> completed | failed`, and keeps
//! per-status counters that always agree with the records.
//!
//! The download, extraction, transcription and rendering steps are not
//! implemented here. They plug in through `runtime::TaskProcessor` and
//! report progress back at fixed checkpoints.
//!
//! ## Key Features
//!
//! - **Priority + FIFO**: higher priority first, submission order among equals
//! - **Strict state machine**: illegal transitions are rejected and change nothing
//! - **Explicit retry**: failed tasks stay failed until a caller retries them
//! - **Lazy queue deletion** with a bounded scan per batch
//! - **Worker pool**: dedicated OS threads, each with its own tokio runtime
//!
//! ```rust,ignore
//! use media_task_scheduler::core::{TaskScheduler, TaskStatus};
//!
//! let scheduler = TaskScheduler::new();
//! let id = scheduler.submit(video, 10)?;
//!
//! for id in scheduler.next_batch(4) {
//!     // ... download, extract, transcribe, render ...
//!     scheduler.report_progress(id, 100)?;
//!     scheduler.set_status(id, TaskStatus::Completed)?;
//! }
//!
//! let stats = scheduler.stats();
//! scheduler.reap_completed();
//! ```
//!
//! For a threaded setup see `runtime::WorkerPool` (feature `tokio-runtime`)
//! and `tests/worker_pool_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Task records, store, queue seam and the scheduler.
pub mod core;
/// Configuration models for the scheduler and worker pool.
pub mod config;
/// Queue backends.
pub mod infra;
/// Worker pool and request/response surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
