use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the naming, store and monitor layers.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No stored session with this ID
    #[error("session not found: {0}")]
    NotFound(String),

    /// The monitor has no entry for this ID
    #[error("session is not being monitored: {0}")]
    NotMonitoring(String),

    #[error("session is already being monitored: {0}")]
    AlreadyMonitoring(String),

    /// Empty or malformed input
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("invalid session id {id:?}: {reason}")]
    InvalidSessionId { id: String, reason: String },

    /// Two different (project, worktree, branch) triples produced the same ID
    #[error("session id {id} is already used by {existing}")]
    IdCollision { id: String, existing: String },

    /// A tmux or OS call failed or timed out
    #[error("{operation} failed: {source:#}")]
    External {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Both the output signal and the process-table signal failed
    #[error("state detection failed (output capture: {output}; process query: {process})")]
    DetectionFailed { output: String, process: String },

    /// Reading or writing the state file failed
    #[error("state file I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SessionError {
    pub(crate) fn external(operation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::External {
            operation: operation.into(),
            source,
        }
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for the "unknown session" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::NotMonitoring(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
