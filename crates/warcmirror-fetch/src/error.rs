//! Error taxonomy for the download engine.
//!
//! Connection-level failures are the only retryable class; everything else
//! either fails the current attempt (missing size) or the whole task
//! (overrun, checksum mismatch, exhausted budget).

use std::path::PathBuf;

use thiserror::Error;

/// Classifies errors the retry layer may transparently re-attempt.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Transport-level errors from an [`HttpClient`](crate::HttpClient).
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("server returned HTTP {code}")]
    Status { code: u16 },

    #[error("http error: {0}")]
    Other(String),
}

impl Transient for HttpError {
    fn is_transient(&self) -> bool {
        matches!(self, HttpError::Connect(_) | HttpError::Timeout)
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            HttpError::Status {
                code: status.as_u16(),
            }
        } else if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_connect() || e.is_body() {
            // Includes resets mid-body; the bytes already written stay valid
            // and the next attempt resumes past them. Request construction
            // and policy errors stay non-transient.
            HttpError::Connect(e.to_string())
        } else {
            HttpError::Other(e.to_string())
        }
    }
}

/// Everything that can end a single download task.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("response carries neither Content-Range total nor Content-Length")]
    MissingContentSize,

    #[error("downloaded too much: {written} > {expected}")]
    Overrun { written: u64, expected: u64 },

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("gave up after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("duplicate destination in this run: {0}")]
    DuplicateDestination(PathBuf),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Transient for FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Http(e) if e.is_transient())
    }
}

/// Run-level failures of the worker pool, distinct from any task's error.
#[derive(Debug, Error)]
pub enum PoolError<E: std::error::Error> {
    #[error("task source failed: {0}")]
    Source(#[source] E),

    #[error("worker aborted: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Raised by the circuit breaker when consecutive failures pass the
/// threshold; continuing would only hammer an unreachable remote.
#[derive(Debug, Error)]
#[error("{consecutive} consecutive failures (threshold {threshold}); aborting run")]
pub struct BreakerTripped {
    pub consecutive: u32,
    pub threshold: u32,
}
