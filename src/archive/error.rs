use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the export/import pipeline.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The local catalog is not in a state that allows the operation.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive is missing required metadata or it cannot be parsed.
    #[error("Invalid archive format: {0}")]
    Format(String),

    /// The compressed container could not be written or read.
    #[error("Archive container error: {0}")]
    Archive(String),

    #[error("Catalog store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ArchiveError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(err: zip::result::ZipError) -> Self {
        ArchiveError::Archive(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ArchiveError {
    fn from(err: tokio::task::JoinError) -> Self {
        ArchiveError::Archive(format!("Archive task was interrupted: {}", err))
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
