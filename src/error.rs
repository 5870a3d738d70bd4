use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Fatal outcomes of a cleaning run. None of them is retried.
#[derive(Error, Debug)]
pub enum CleanError {
    #[error("artifact '{reference}' not found: {reason}")]
    ArtifactNotFound { reference: String, reason: String },

    #[error("malformed input {}: {reason}", .path.display())]
    MalformedInput { path: PathBuf, reason: String },

    #[error("failed to log artifact '{name}': {reason}")]
    Upload { name: String, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CleanError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CleanError::MalformedInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<StoreError> for CleanError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { reference, reason } => {
                CleanError::ArtifactNotFound { reference, reason }
            }
            StoreError::InvalidReference(reference) => CleanError::ArtifactNotFound {
                reason: "invalid artifact reference".to_string(),
                reference,
            },
            StoreError::Rejected { name, reason } => CleanError::Upload { name, reason },
            StoreError::Io { path, source } => CleanError::Io { path, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanError>;
