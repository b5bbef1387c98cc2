use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FetchError;

/// Terminal state of one task. Exactly one per task, no exceptions: worker
/// code converts every error into `Failed` instead of letting it escape.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Full advertised size received, verified, and renamed into place.
    Completed {
        path: PathBuf,
        size: u64,
        elapsed: Duration,
        checksum: String,
    },

    /// Destination already existed; no network call was made.
    AlreadyPresent { path: PathBuf },

    /// The task ended in an error. `size` is the server-advertised total
    /// when the headers were read before the failure.
    Failed {
        path: PathBuf,
        size: Option<u64>,
        elapsed: Duration,
        error: FetchError,
    },
}

impl DownloadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, DownloadOutcome::Failed { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            DownloadOutcome::Completed { path, .. }
            | DownloadOutcome::AlreadyPresent { path }
            | DownloadOutcome::Failed { path, .. } => path,
        }
    }
}

/// A task's outcome paired with its reporting identity, as delivered on the
/// pool's merged result stream (completion order).
#[derive(Debug)]
pub struct TaskResult {
    pub item: String,
    pub name: String,
    pub outcome: DownloadOutcome,
}
