use std::path::PathBuf;
use thiserror::Error;

/// Scan-setup failures. Anything that goes wrong inside a single
/// subfolder is reported as a degenerate [`crate::SizeResult`] instead.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Path does not exist: {0}")]
    InvalidPath(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot list subfolders of {path}: {source}")]
    ListingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {what}: {source}")]
    Spawn {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, ScanError>;
