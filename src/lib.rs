pub mod error;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use error::{PlanError, ScanError, StartError};
pub use models::{ExportOutcome, ExportRequest, FileJob, JobOutcome, WorkItem};
pub use services::{
    CompletionCallback, ExportConfig, ExportHandle, ExportSession, ProgressCallback,
};
pub use utils::{contains_tag, contains_tag_with, destination_for, is_valid_directory, PathMatcher};

// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub export: ExportConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export: ExportConfig::default(),
            log_level: "info".to_string(),
        }
    }
}
