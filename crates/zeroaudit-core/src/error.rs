use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::snapshot::Phase;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{phase} snapshot capture failed: {message}")]
    Capture { phase: Phase, message: String },

    #[error("target exited before the {phase} snapshot ({status})")]
    TargetExited { phase: Phase, status: String },

    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    #[error("filesystem error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid pattern '{label}': {message}")]
    InvalidPattern { label: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
