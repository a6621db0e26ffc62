use std::path::PathBuf;
use thiserror::Error;

/// Why an export run did not start.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("an export run is already in progress")]
    Busy,

    #[error("source is not an existing directory: {0:?}")]
    InvalidSource(PathBuf),

    #[error("destination is not an existing directory: {0:?}")]
    InvalidDestination(PathBuf),

    #[error("source and destination resolve to the same directory: {0:?}")]
    SameDirectory(PathBuf),

    #[error("unknown text encoding label: {0}")]
    UnknownEncoding(String),
}

/// Failure of a single decode attempt while scanning file content.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("content is not valid {encoding}")]
    Decode { encoding: &'static str },
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{path:?} is not located under {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{0:?} has no file name")]
    NoFileName(PathBuf),
}
