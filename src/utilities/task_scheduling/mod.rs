//! Off-thread work with explicit completion handles.
//!
//! - `WorkerPool`: a fixed set of threads draining a job queue
//! - `TaskHandle`: the submitter's view of one job's result (`is_ready`, `take`, `wait`)
//! - `TaskCompletion`: the worker's one-shot publisher for that result

mod task_handle;
mod worker_pool;

pub use task_handle::{task_pair, TaskCompletion, TaskError, TaskHandle};
pub use worker_pool::WorkerPool;
