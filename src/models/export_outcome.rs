use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// What happened to one `FileJob` after a worker processed it
#[derive(Debug, Clone)]
pub enum JobOutcome {
    /// Path is not an export candidate (extension, compound suffix, directory).
    Rejected,
    /// Candidate whose content does not carry the tag.
    Untagged,
    Copied {
        source: PathBuf,
        destination: PathBuf,
    },
    Failed {
        source: PathBuf,
        destination: Option<PathBuf>,
        error: String,
    },
}

impl JobOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, JobOutcome::Copied { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CopiedFile {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyFailure {
    pub source: String,
    pub destination: Option<String>,
    pub error: String,
}

/// Running totals of job outcomes. Only copies and failures are kept as
/// records; rejected and untagged entries are counted.
#[derive(Debug, Clone, Default)]
pub struct JobTally {
    pub rejected: usize,
    pub untagged: usize,
    pub copied_files: Vec<CopiedFile>,
    pub failures: Vec<CopyFailure>,
}

impl JobTally {
    pub fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Rejected => self.rejected += 1,
            JobOutcome::Untagged => self.untagged += 1,
            JobOutcome::Copied { source, destination } => self.copied_files.push(CopiedFile {
                source: source.to_string_lossy().to_string(),
                destination: destination.to_string_lossy().to_string(),
            }),
            JobOutcome::Failed {
                source,
                destination,
                error,
            } => self.failures.push(CopyFailure {
                source: source.to_string_lossy().to_string(),
                destination: destination.map(|d| d.to_string_lossy().to_string()),
                error,
            }),
        }
    }

    pub fn merge(&mut self, mut other: JobTally) {
        self.rejected += other.rejected;
        self.untagged += other.untagged;
        self.copied_files.append(&mut other.copied_files);
        self.failures.append(&mut other.failures);
    }

    /// Number of jobs recorded so far
    pub fn jobs(&self) -> usize {
        self.rejected + self.untagged + self.copied_files.len() + self.failures.len()
    }
}

/// Final report of an export run, delivered once per run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub run_id: Uuid,
    pub success: bool,
    pub message: Option<String>,
    pub total_discovered: usize,
    pub candidates: usize,
    pub copied: usize,
    pub untagged: usize,
    pub copied_files: Vec<CopiedFile>,
    pub failures: Vec<CopyFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExportOutcome {
    /// Build the outcome from the tally collected by the workers
    pub fn from_tally(
        run_id: Uuid,
        total_discovered: usize,
        tally: JobTally,
        started_at: DateTime<Utc>,
    ) -> Self {
        let JobTally {
            untagged,
            copied_files,
            failures,
            ..
        } = tally;

        let message = match failures.len() {
            0 => None,
            1 => Some(format!("1 file failed to export: {}", failures[0].error)),
            n => Some(format!("{} files failed to export", n)),
        };

        Self {
            run_id,
            success: failures.is_empty(),
            message,
            total_discovered,
            candidates: untagged + copied_files.len() + failures.len(),
            copied: copied_files.len(),
            untagged,
            copied_files,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Jobs that reached a copy decision
    pub fn processed(&self) -> usize {
        self.copied + self.untagged + self.failures.len()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
