//! Configuration models for the scheduler and its worker pool.

pub mod scheduler;
pub mod worker;

pub use scheduler::{PipelineConfig, SchedulerConfig, ENV_PREFIX};
pub use worker::WorkerPoolConfig;
