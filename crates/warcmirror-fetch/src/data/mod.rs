//! Immutable tasks, outcomes and configuration.

mod options;
mod outcome;
mod task;

pub use options::{PoolOptions, RetryPolicy, TransferMode, TransferOptions};
pub use outcome::{DownloadOutcome, TaskResult};
pub use task::DownloadTask;
