use thiserror::Error;

/// Typed remote-store errors enabling retry classification.
///
/// `is_retryable()` separates transient failures (rate limits, server errors,
/// dropped connections) from terminal ones; `is_fatal()` marks the single
/// condition that aborts a whole run rather than one item.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("authorization expired or revoked, re-authorize and run again")]
    AuthExpired,

    #[error("content flagged by the remote store: {0}")]
    FlaggedContent(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    /// Whether this error is transient and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            RemoteError::Transport(_) => true,
            RemoteError::AuthExpired
            | RemoteError::FlaggedContent(_)
            | RemoteError::Decode(_)
            | RemoteError::NotFound(_) => false,
        }
    }

    /// Whether this error must abort the whole run, not just one item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RemoteError::AuthExpired)
    }
}
