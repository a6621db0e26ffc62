pub mod export_session;
pub mod worker_pool;

pub use export_session::{
    CompletionCallback, ExportConfig, ExportHandle, ExportSession, ProgressCallback,
};
pub use worker_pool::{process_job, JobContext, JobSender, WorkerPool};
