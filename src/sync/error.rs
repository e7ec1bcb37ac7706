use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

/// Engine-level errors. Per-item failures are logged and recorded against
/// that item only; `is_run_fatal()` picks out the one condition that stops
/// the traversal.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unreadable snapshot {path}: {reason}")]
    Snapshot { path: PathBuf, reason: String },

    #[error("metadata serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, SyncError::Remote(e) if e.is_fatal())
    }

    /// Whether the fetcher should hand this error one acknowledged retry.
    pub fn is_flagged_content(&self) -> bool {
        matches!(self, SyncError::Remote(RemoteError::FlaggedContent(_)))
    }
}
