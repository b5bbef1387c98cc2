use thiserror::Error;
use warcmirror_fetch::{HttpError, Transient};

/// Failures while producing tasks, before any download starts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("malformed item metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("invalid filename filter: {0}")]
    Filter(#[from] regex::Error),

    #[error("listing I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Transient for SourceError {
    fn is_transient(&self) -> bool {
        matches!(self, SourceError::Http(e) if e.is_transient())
    }
}
