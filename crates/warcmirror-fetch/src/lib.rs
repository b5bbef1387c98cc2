//! Resumable parallel downloading of large immutable archive files.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable tasks, outcomes and configuration
//! - [`core`] - Pure transformations (backoff delays, size resolution,
//!   temp-file naming, the circuit-breaker state machine)
//! - [`effects`] - I/O operations behind the [`HttpClient`] trait seam
//!
//! # Key Features
//!
//! - **Resumable**: a hidden temp file's length is an exact count of the
//!   bytes confirmed so far; interrupted transfers restart with a byte-range
//!   request from that offset, across process restarts.
//! - **Single-Pass**: the running checksum is fed while streaming to disk,
//!   so multi-gigabyte files are never read twice.
//! - **Atomic Placement**: a file appears under its final name only via a
//!   rename after the full advertised size was received and verified.
//! - **Failure Containment**: every per-task error becomes a `Failed`
//!   outcome at the worker boundary; only the circuit breaker escalates.

mod core;
mod data;
mod effects;
mod error;

pub use core::{
    CircuitBreaker, DEFAULT_TRIP_THRESHOLD, content_range_total, expected_total, hidden_temp_path,
    retry_delay, worker_temp_path,
};
pub use data::{
    DownloadOutcome, DownloadTask, PoolOptions, RetryPolicy, TaskResult, TransferMode,
    TransferOptions,
};
pub use effects::{
    BoxStream, ByteStream, HttpClient, RemoteResponse, WorkerPool, download, hash_file,
    with_backoff,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{BreakerTripped, FetchError, HttpError, PoolError, Transient};
