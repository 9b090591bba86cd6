//! Thread pool that drains a [`TaskScheduler`].
//!
//! A dispatcher thread polls `next_batch` and hands claimed ids to worker
//! threads over a bounded channel. Each worker owns a single-threaded tokio
//! runtime and drives one task at a time through a [`TaskProcessor`],
//! then reports the outcome back to the scheduler.
//!
//! The dispatcher never claims more ids than there are free in-flight
//! slots, so every claimed id has room in the channel and no claimed task
//! is left stranded in `processing`.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::Context;
use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{PipelineConfig, WorkerPoolConfig};
use crate::core::{AppResult, SchedulerError, TaskId, TaskQueue, TaskRecord, TaskScheduler, TaskStatus};

/// Checkpoints a media task passes through, with the progress each one
/// reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Source media fetched.
    Downloaded,
    /// Audio track extracted.
    AudioExtracted,
    /// Speech transcribed.
    Transcribed,
    /// Document rendered.
    Rendered,
    /// Output published.
    Published,
}

impl PipelineStage {
    /// Every stage in pipeline order.
    pub const ALL: [Self; 5] = [
        Self::Downloaded,
        Self::AudioExtracted,
        Self::Transcribed,
        Self::Rendered,
        Self::Published,
    ];

    /// Progress percentage reached when the stage finishes.
    #[must_use]
    pub const fn progress(self) -> u8 {
        match self {
            Self::Downloaded => 20,
            Self::AudioExtracted => 40,
            Self::Transcribed => 60,
            Self::Rendered => 80,
            Self::Published => 100,
        }
    }
}

/// Anything that accepts progress reports for a task id.
pub trait ProgressSink: Send + Sync {
    /// Record progress; returns the clamped value that was stored.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    fn report_progress(&self, id: TaskId, value: i64) -> Result<u8, SchedulerError>;
}

impl<P, Q> ProgressSink for TaskScheduler<P, Q>
where
    P: Send + Sync,
    Q: TaskQueue + Send,
{
    fn report_progress(&self, id: TaskId, value: i64) -> Result<u8, SchedulerError> {
        TaskScheduler::<P, Q>::report_progress(self, id, value)
    }
}

/// Handle given to a processor for reporting progress on its task.
#[derive(Clone)]
pub struct ProgressReporter {
    id: TaskId,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressReporter {
    /// Reporter for `id` writing into `sink`.
    pub fn new(id: TaskId, sink: Arc<dyn ProgressSink>) -> Self {
        Self { id, sink }
    }

    /// Task this reporter writes to.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.id
    }

    /// Report a raw percentage (clamped by the scheduler).
    ///
    /// # Errors
    ///
    /// `NotFound` if the task was reaped meanwhile.
    pub fn report(&self, value: i64) -> Result<u8, SchedulerError> {
        self.sink.report_progress(self.id, value)
    }

    /// Report that `stage` finished.
    ///
    /// # Errors
    ///
    /// `NotFound` if the task was reaped meanwhile.
    pub fn stage(&self, stage: PipelineStage) -> Result<u8, SchedulerError> {
        self.report(i64::from(stage.progress()))
    }
}

/// Business logic run for each claimed task.
///
/// `Ok(())` completes the task; `Err(message)` fails it with that message,
/// leaving it available for an explicit retry.
#[async_trait]
pub trait TaskProcessor<P>: Send + Sync + Clone + 'static
where
    P: Send + Sync + 'static,
{
    /// Process one task.
    async fn process(&self, task: TaskRecord<P>, progress: ProgressReporter) -> Result<(), String>;
}

/// Errors raised while starting a worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An OS thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerPoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Ids handed to workers since start.
    pub dispatched: usize,
    /// Tasks that ended in `completed`.
    pub succeeded: usize,
    /// Tasks that ended in `failed`.
    pub failed: usize,
    /// Tasks a worker is running right now.
    pub active: usize,
    /// Claimed tasks not yet finished, queued or running.
    pub in_flight: usize,
}

#[derive(Debug, Default)]
struct PoolCounters {
    dispatched: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    active: AtomicUsize,
    in_flight: AtomicUsize,
}

impl PoolCounters {
    fn snapshot(&self, worker_count: usize) -> WorkerPoolStats {
        WorkerPoolStats {
            worker_count,
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
        }
    }
}

/// Dispatcher plus worker threads bound to one scheduler.
pub struct WorkerPool<P, E>
where
    P: Send + Sync + 'static,
    E: TaskProcessor<P>,
{
    config: WorkerPoolConfig,
    scheduler: Arc<TaskScheduler<P>>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
    /// Dropping the sender wakes an idle dispatcher.
    stop_tx: Mutex<Option<Sender<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    _processor: PhantomData<E>,
}

impl<P, E> WorkerPool<P, E>
where
    P: Send + Sync + 'static,
    E: TaskProcessor<P>,
{
    /// Spawn `config.worker_count` workers and a dispatcher draining
    /// `scheduler`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if validation fails, `Spawn` if a thread cannot be
    /// created.
    pub fn start(
        config: WorkerPoolConfig,
        scheduler: Arc<TaskScheduler<P>>,
        processor: E,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (task_tx, task_rx) = bounded::<TaskId>(config.max_in_flight);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let counters = Arc::new(PoolCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            workers.push(spawn_worker(
                worker_id,
                task_rx.clone(),
                Arc::clone(&scheduler),
                Arc::clone(&counters),
                processor.clone(),
                config.thread_stack_size,
            )?);
        }
        drop(task_rx);

        let dispatcher = spawn_dispatcher(
            config.clone(),
            task_tx,
            stop_rx,
            Arc::clone(&scheduler),
            Arc::clone(&counters),
            Arc::clone(&shutdown),
        )?;

        info!(
            worker_count = config.worker_count,
            batch_size = config.batch_size,
            max_in_flight = config.max_in_flight,
            "worker pool started"
        );

        Ok(Self {
            config,
            scheduler,
            counters,
            shutdown,
            stop_tx: Mutex::new(Some(stop_tx)),
            dispatcher: Mutex::new(Some(dispatcher)),
            workers: Mutex::new(workers),
            _processor: PhantomData,
        })
    }

    /// Scheduler this pool drains.
    #[must_use]
    pub fn scheduler(&self) -> &Arc<TaskScheduler<P>> {
        &self.scheduler
    }

    /// Current activity counters.
    #[must_use]
    pub fn stats(&self) -> WorkerPoolStats {
        self.counters.snapshot(self.config.worker_count)
    }

    /// Stop claiming new tasks, let workers finish what was already
    /// claimed, and join every thread.
    pub fn shutdown(&self) {
        if self.signal_stop() {
            info!("shutting down worker pool");
        }

        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                warn!("dispatcher thread panicked");
            }
        }

        let mut workers = self.workers.lock();
        let worker_count = workers.len();
        for (worker_id, handle) in workers.drain(..).enumerate() {
            if handle.join().is_err() {
                warn!(worker_id, "worker thread panicked");
            }
        }
        if worker_count > 0 {
            info!(worker_count, "worker pool shut down");
        }
    }

    /// Returns false if shutdown was already signalled.
    fn signal_stop(&self) -> bool {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.stop_tx.lock().take();
        true
    }
}

impl<P, E> Drop for WorkerPool<P, E>
where
    P: Send + Sync + 'static,
    E: TaskProcessor<P>,
{
    fn drop(&mut self) {
        // Threads are detached here; `shutdown` is the joining path.
        if self.signal_stop() {
            debug!("worker pool dropped without explicit shutdown");
        }
    }
}

/// Build a scheduler and a pool from one validated configuration.
///
/// # Errors
///
/// Configuration or thread start-up failure, with context.
pub fn launch<P, E>(
    config: &PipelineConfig,
    processor: E,
) -> AppResult<(Arc<TaskScheduler<P>>, WorkerPool<P, E>)>
where
    P: Send + Sync + 'static,
    E: TaskProcessor<P>,
{
    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("pipeline configuration rejected")?;
    let scheduler = Arc::new(
        TaskScheduler::with_config(config.scheduler.clone())
            .context("failed to build scheduler")?,
    );
    let pool = WorkerPool::start(config.worker_pool.clone(), Arc::clone(&scheduler), processor)
        .context("failed to start worker pool")?;
    Ok((scheduler, pool))
}

fn spawn_dispatcher<P>(
    config: WorkerPoolConfig,
    task_tx: Sender<TaskId>,
    stop_rx: Receiver<()>,
    scheduler: Arc<TaskScheduler<P>>,
    counters: Arc<PoolCounters>,
    shutdown: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, PoolError>
where
    P: Send + Sync + 'static,
{
    let handle = thread::Builder::new()
        .name("task-dispatcher".into())
        .spawn(move || {
            debug!("dispatcher started");
            let poll_interval = config.poll_interval();

            while !shutdown.load(Ordering::Acquire) {
                let in_flight = counters.in_flight.load(Ordering::Acquire);
                let free = config.max_in_flight.saturating_sub(in_flight);
                let batch = if free == 0 {
                    Vec::new()
                } else {
                    scheduler.next_batch(config.batch_size.min(free))
                };

                if batch.is_empty() {
                    match stop_rx.recv_timeout(poll_interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                for id in batch {
                    counters.in_flight.fetch_add(1, Ordering::AcqRel);
                    if task_tx.send(id).is_err() {
                        counters.in_flight.fetch_sub(1, Ordering::AcqRel);
                        error!(task_id = %id, "no worker left to take claimed task");
                        record_failure(&scheduler, &counters, id, "worker pool unavailable");
                        continue;
                    }
                    counters.dispatched.fetch_add(1, Ordering::Relaxed);
                }
            }
            debug!("dispatcher exiting");
        })?;
    Ok(handle)
}

fn spawn_worker<P, E>(
    worker_id: usize,
    task_rx: Receiver<TaskId>,
    scheduler: Arc<TaskScheduler<P>>,
    counters: Arc<PoolCounters>,
    processor: E,
    stack_size: usize,
) -> Result<JoinHandle<()>, PoolError>
where
    P: Send + Sync + 'static,
    E: TaskProcessor<P>,
{
    let handle = thread::Builder::new()
        .name(format!("task-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            debug!(worker_id, "worker thread started");

            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(worker_id, error = %e, "failed to create worker runtime");
                    // Fail whatever reaches this worker so nothing stays claimed.
                    for id in &task_rx {
                        record_failure(
                            &scheduler,
                            &counters,
                            id,
                            format!("worker runtime unavailable: {e}"),
                        );
                        counters.in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                    return;
                }
            };

            // Channel closes once the dispatcher exits and the queue drains.
            for id in &task_rx {
                counters.active.fetch_add(1, Ordering::AcqRel);
                run_task(worker_id, id, &rt, &scheduler, &counters, &processor);
                counters.active.fetch_sub(1, Ordering::AcqRel);
                counters.in_flight.fetch_sub(1, Ordering::AcqRel);
            }

            debug!(worker_id, "worker thread exiting");
        })?;
    Ok(handle)
}

/// Fail a claimed task. `counters.failed` moves only if the scheduler
/// accepted the report.
fn record_failure<P>(
    scheduler: &TaskScheduler<P>,
    counters: &PoolCounters,
    id: TaskId,
    message: impl Into<String>,
) -> bool {
    match scheduler.report_error(id, message) {
        Ok(()) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            true
        }
        Err(e) => {
            warn!(task_id = %id, error = %e, "could not record task failure");
            false
        }
    }
}

fn run_task<P, E>(
    worker_id: usize,
    id: TaskId,
    rt: &tokio::runtime::Runtime,
    scheduler: &Arc<TaskScheduler<P>>,
    counters: &PoolCounters,
    processor: &E,
) where
    P: Send + Sync + 'static,
    E: TaskProcessor<P>,
{
    let record = match scheduler.get(id) {
        Ok(record) => record,
        Err(e) => {
            warn!(worker_id, task_id = %id, error = %e, "claimed task disappeared");
            return;
        }
    };

    debug!(worker_id, task_id = %id, "worker processing task");
    let sink: Arc<dyn ProgressSink> = Arc::clone(scheduler) as Arc<dyn ProgressSink>;
    let reporter = ProgressReporter::new(id, sink);
    let processor = processor.clone();

    // Spawned so a panicking processor surfaces as a JoinError.
    let outcome = rt.block_on(async move {
        tokio::spawn(async move { processor.process(record, reporter).await }).await
    });

    let (result, counter) = match outcome {
        Ok(Ok(())) => (
            scheduler.set_status(id, TaskStatus::Completed),
            &counters.succeeded,
        ),
        Ok(Err(message)) => (scheduler.report_error(id, message), &counters.failed),
        Err(join_err) => {
            error!(worker_id, task_id = %id, error = %join_err, "processor panicked");
            (
                scheduler.report_error(id, format!("processor panicked: {join_err}")),
                &counters.failed,
            )
        }
    };

    match result {
        Ok(()) => {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            warn!(worker_id, task_id = %id, error = %e, "could not record task outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_counts_only_accepted_reports() {
        let scheduler = TaskScheduler::new();
        let counters = PoolCounters::default();
        let id = scheduler.submit("bv1", 1).unwrap();

        // Still pending: the scheduler rejects the report.
        assert!(!record_failure(&scheduler, &counters, id, "no worker"));
        assert_eq!(counters.failed.load(Ordering::Relaxed), 0);
        assert_eq!(scheduler.status(id).unwrap(), TaskStatus::Pending);

        assert_eq!(scheduler.next_batch(1), vec![id]);
        assert!(record_failure(&scheduler, &counters, id, "no worker"));
        assert_eq!(counters.failed.load(Ordering::Relaxed), 1);
        assert_eq!(scheduler.error(id).unwrap().as_deref(), Some("no worker"));
    }

    #[test]
    fn test_record_failure_on_unknown_id() {
        let scheduler: TaskScheduler<()> = TaskScheduler::new();
        let counters = PoolCounters::default();
        assert!(!record_failure(&scheduler, &counters, TaskId::new(), "gone"));
        assert_eq!(counters.snapshot(1).failed, 0);
    }
}
