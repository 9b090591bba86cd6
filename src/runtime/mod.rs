//! Runtime adapters: the worker pool and the request/response surface.

pub mod api;
#[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
pub mod worker;

pub use api::{dispatch_json, handle, Request, Response};
#[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
pub use worker::{
    launch, PipelineStage, PoolError, ProgressReporter, ProgressSink, TaskProcessor, WorkerPool,
    WorkerPoolStats,
};
