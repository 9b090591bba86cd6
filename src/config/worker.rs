//! Worker pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the thread pool that drains a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Upper bound on ids claimed per `next_batch` call.
    pub batch_size: usize,
    /// Dispatcher sleep when a poll returns nothing, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum claimed-but-unfinished tasks; also the channel capacity.
    pub max_in_flight: usize,
    /// Stack size for worker threads, in bytes.
    pub thread_stack_size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            batch_size: 10,
            poll_interval_ms: 50,
            max_in_flight: 64,
            thread_stack_size: 2 * 1024 * 1024,
        }
    }
}

impl WorkerPoolConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker thread count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the per-poll batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the idle poll interval.
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the in-flight limit.
    #[must_use]
    pub const fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Set the worker stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, thread_stack_size: usize) -> Self {
        self.thread_stack_size = thread_stack_size;
        self
    }

    /// Idle poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.max_in_flight == 0 {
            return Err("max_in_flight must be greater than 0".into());
        }
        if self.thread_stack_size < 64 * 1024 {
            return Err("thread_stack_size must be at least 64 KiB".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let cfg = WorkerPoolConfig::new()
            .with_worker_count(2)
            .with_batch_size(3)
            .with_poll_interval_ms(7)
            .with_max_in_flight(8);
        assert_eq!(cfg.worker_count, 2);
        assert_eq!(cfg.batch_size, 3);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(7));
        assert_eq!(cfg.max_in_flight, 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerPoolConfig::new().with_worker_count(0).validate().is_err());
    }

    #[test]
    fn test_tiny_stack_rejected() {
        assert!(WorkerPoolConfig::new()
            .with_thread_stack_size(1024)
            .validate()
            .is_err());
    }
}
