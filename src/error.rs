use crate::models::{ErrorKind, ErrorRecord};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Discovery unavailable: {0}")]
    DiscoveryUnavailable(String),

    #[error("Clone failed for {repository}: {reason}")]
    CloneFailed { repository: String, reason: String },

    #[error("Staging I/O failure at {}: {source}", .path.display())]
    StagingIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of {} to {key} failed: {reason}", .path.display())]
    UploadFailed {
        path: PathBuf,
        key: String,
        reason: String,
    },
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::DiscoveryUnavailable(_) => ErrorKind::DiscoveryUnavailable,
            IngestError::CloneFailed { .. } => ErrorKind::CloneFailed,
            IngestError::StagingIo { .. } => ErrorKind::StagingIoFailure,
            IngestError::UploadFailed { .. } => ErrorKind::UploadFailed,
        }
    }

    /// Converts the error into the record kept in a run outcome.
    pub fn into_record(self, repository: Option<&str>) -> ErrorRecord {
        let path = match &self {
            IngestError::StagingIo { path, .. } | IngestError::UploadFailed { path, .. } => {
                Some(path.clone())
            }
            _ => None,
        };
        let repository = match &self {
            IngestError::CloneFailed { repository, .. } => Some(repository.clone()),
            _ => repository.map(str::to_string),
        };

        ErrorRecord {
            kind: self.kind(),
            repository,
            path,
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
