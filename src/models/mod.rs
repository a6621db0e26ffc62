pub mod export_outcome;
pub mod export_request;

pub use export_outcome::{CopiedFile, CopyFailure, ExportOutcome, JobOutcome, JobTally};
pub use export_request::{
    available_workers, clamp_worker_count, ExportRequest, FileJob, WorkItem,
};
