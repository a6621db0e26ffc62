use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inputs of a single export run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRequest {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub tag: String,
    pub worker_count: usize,
}

impl ExportRequest {
    /// Create a new request; `worker_count` is clamped to `[1, available_parallelism]`.
    pub fn new(
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
        tag: impl Into<String>,
        worker_count: usize,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            tag: tag.into(),
            worker_count: clamp_worker_count(worker_count),
        }
    }
}

/// Number of workers the host can usefully run at once
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

pub fn clamp_worker_count(requested: usize) -> usize {
    requested.clamp(1, available_workers().max(1))
}

/// A single filesystem path discovered under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    pub path: PathBuf,
}

impl FileJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Item carried by the job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Job(FileJob),
    /// Tells the worker that receives it to leave its loop.
    Shutdown,
}
