//! Request/response models for exposing a scheduler remotely.
//!
//! One request variant per scheduler operation; every failure comes back as
//! [`Response::Error`] carrying an explicit [`ErrorCode`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::{ErrorCode, SchedulerError, TaskId, TaskQueue, TaskRecord, TaskScheduler, TaskStats, TaskStatus};

/// Operation requested by a remote caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request<P> {
    /// Create a task.
    Submit {
        /// Opaque work description.
        payload: P,
        /// Priority; the scheduler default when absent.
        #[serde(default)]
        priority: Option<i32>,
    },
    /// Claim ready tasks.
    NextBatch {
        /// Batch size; the scheduler default when absent.
        #[serde(default)]
        max_size: Option<usize>,
    },
    /// Record progress.
    ReportProgress {
        /// Target task.
        task_id: TaskId,
        /// Raw value, clamped to 0..=100.
        progress: i64,
    },
    /// Change status.
    SetStatus {
        /// Target task.
        task_id: TaskId,
        /// Requested status.
        status: TaskStatus,
    },
    /// Fail a processing task.
    ReportError {
        /// Target task.
        task_id: TaskId,
        /// Failure message.
        message: String,
    },
    /// Requeue a failed task.
    Retry {
        /// Target task.
        task_id: TaskId,
    },
    /// Delete completed tasks.
    ReapCompleted,
    /// Read counters.
    Stats,
    /// Read one record.
    Get {
        /// Target task.
        task_id: TaskId,
    },
}

/// Result of a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response<P> {
    /// Task created.
    Submitted {
        /// New id.
        task_id: TaskId,
    },
    /// Claimed ids, in priority order.
    Batch {
        /// Ids now in `processing`.
        task_ids: Vec<TaskId>,
    },
    /// Progress stored.
    Progress {
        /// Target task.
        task_id: TaskId,
        /// Value after clamping.
        progress: u8,
    },
    /// Status change, error report or retry applied.
    Ack {
        /// Target task.
        task_id: TaskId,
    },
    /// Completed tasks deleted.
    Reaped {
        /// Number removed.
        count: usize,
    },
    /// Counter snapshot.
    Stats {
        /// Per-status counts.
        stats: TaskStats,
    },
    /// Record snapshot.
    Task {
        /// The record.
        task: TaskRecord<P>,
    },
    /// Operation rejected; nothing changed.
    Error {
        /// Machine-readable code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
}

impl<P> From<SchedulerError> for Response<P> {
    fn from(err: SchedulerError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Run one request against `scheduler`.
pub fn handle<P, Q>(scheduler: &TaskScheduler<P, Q>, req: Request<P>) -> Response<P>
where
    Q: TaskQueue,
{
    let result = match req {
        Request::Submit { payload, priority } => match priority {
            Some(p) => scheduler.submit(payload, p),
            None => scheduler.submit_default(payload),
        }
        .map(|task_id| Response::Submitted { task_id }),
        Request::NextBatch { max_size } => Ok(Response::Batch {
            task_ids: max_size.map_or_else(
                || scheduler.next_default_batch(),
                |n| scheduler.next_batch(n),
            ),
        }),
        Request::ReportProgress { task_id, progress } => scheduler
            .report_progress(task_id, progress)
            .map(|progress| Response::Progress { task_id, progress }),
        Request::SetStatus { task_id, status } => scheduler
            .set_status(task_id, status)
            .map(|()| Response::Ack { task_id }),
        Request::ReportError { task_id, message } => scheduler
            .report_error(task_id, message)
            .map(|()| Response::Ack { task_id }),
        Request::Retry { task_id } => scheduler.retry(task_id).map(|()| Response::Ack { task_id }),
        Request::ReapCompleted => Ok(Response::Reaped {
            count: scheduler.reap_completed(),
        }),
        Request::Stats => Ok(Response::Stats {
            stats: scheduler.stats(),
        }),
        Request::Get { task_id } => scheduler.get(task_id).map(|task| Response::Task { task }),
    };
    result.unwrap_or_else(Response::from)
}

/// Decode a JSON request, run it and encode the response. Malformed input
/// yields an `invalid_argument` error response.
pub fn dispatch_json<P, Q>(scheduler: &TaskScheduler<P, Q>, input: &str) -> String
where
    P: Serialize + DeserializeOwned,
    Q: TaskQueue,
{
    let response = match serde_json::from_str::<Request<P>>(input) {
        Ok(req) => handle(scheduler, req),
        Err(e) => Response::Error {
            code: ErrorCode::InvalidArgument,
            message: format!("malformed request: {e}"),
        },
    };
    serde_json::to_string(&response).unwrap_or_else(|e| {
        serde_json::json!({
            "kind": "error",
            "code": ErrorCode::InvalidArgument,
            "message": format!("response encoding failed: {e}"),
        })
        .to_string()
    })
}
