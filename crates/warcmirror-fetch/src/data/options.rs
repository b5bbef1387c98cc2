use std::time::Duration;

use crate::core::retry_delay;

/// How a worker transfers a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferMode {
    /// Byte-range resumption against a store that honors `Range`. The temp
    /// file survives failures and process restarts.
    Resumable,

    /// One authenticated GET verified against an a-priori checksum. No
    /// ranges; the temp file is deleted on every error path.
    FullBody,
}

/// Bounded retries with exponential backoff for transient failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first try.
    pub max_attempts: u32,

    /// Backoff base: the wait before attempt `n + 1` is `base^n` seconds.
    pub base: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: u32) -> Self {
        Self { max_attempts, base }
    }

    /// Delay to sleep after `attempt` (1-indexed) failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        retry_delay(attempt, self.base)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base: 2,
        }
    }
}

/// Per-task transfer configuration, shared read-only by all workers.
#[derive(Clone, Debug)]
pub struct TransferOptions {
    pub mode: TransferMode,

    /// Attempt budget of the resumable loop.
    pub max_attempts: u32,

    /// Recompute the checksum of an already-present destination and
    /// re-download on mismatch.
    pub verify_existing: bool,

    /// Backoff policy for transient failures within a task.
    pub retry: RetryPolicy,
}

impl TransferOptions {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            mode: TransferMode::Resumable,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            verify_existing: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Worker pool sizing and per-task options.
#[derive(Clone, Debug)]
pub struct PoolOptions {
    /// Number of concurrent workers. `1` runs the identical worker logic
    /// fully serialized, for deterministic debugging.
    pub workers: usize,

    pub transfer: TransferOptions,
}

impl PoolOptions {
    pub fn new(workers: usize, transfer: TransferOptions) -> Self {
        Self { workers, transfer }
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            transfer: TransferOptions::default(),
        }
    }
}
