use crate::error::StartError;
use crate::models::{clamp_worker_count, ExportOutcome, ExportRequest, FileJob};
use crate::services::worker_pool::{JobContext, WorkerPool};
use crate::utils::content_scanner::DEFAULT_ENCODING_LABEL;
use crate::utils::file_operations::walk_entries;
use crate::utils::path_matcher::DEFAULT_EXTENSIONS;
use crate::utils::{is_valid_directory, PathMatcher};
use anyhow::{anyhow, Result};
use chrono::Utc;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Called on every supervision tick with `(total_discovered, remaining)`
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync + 'static>;

/// Called once when a run has finished, before the session becomes ready again
pub type CompletionCallback = Box<dyn FnOnce(&ExportOutcome) + Send + 'static>;

/// Configuration for export runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub extensions: Vec<String>,
    pub poll_interval: Duration,
    /// Keep directories out of the job queue instead of letting the matcher reject them.
    pub skip_directories: bool,
    /// WHATWG label of the code page tried before the UTF-8 retry.
    pub default_encoding: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
            poll_interval: Duration::from_millis(33),
            skip_directories: false,
            default_encoding: DEFAULT_ENCODING_LABEL.to_string(),
        }
    }
}

/// Resets the session to idle when the run that owns it ends, even by panic
struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle on a started run
#[derive(Debug)]
pub struct ExportHandle {
    run_id: Uuid,
    completion: oneshot::Receiver<ExportOutcome>,
}

impl ExportHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wait for the run to finish. The session is idle again once this resolves.
    pub async fn wait(self) -> Result<ExportOutcome> {
        self.completion
            .await
            .map_err(|_| anyhow!("export run {} ended without reporting", self.run_id))
    }

    /// Blocking variant of [`ExportHandle::wait`]. Must not be called from
    /// inside an async context.
    pub fn wait_blocking(self) -> Result<ExportOutcome> {
        self.completion
            .blocking_recv()
            .map_err(|_| anyhow!("export run {} ended without reporting", self.run_id))
    }
}

/// Runs at most one export at a time.
///
/// `start` validates the request and returns immediately; enumeration,
/// copying and supervision all happen on the session's runtime.
pub struct ExportSession {
    runtime: Handle,
    config: ExportConfig,
    running: Arc<AtomicBool>,
}

impl ExportSession {
    pub fn new(runtime: Handle) -> Self {
        Self::with_config(runtime, ExportConfig::default())
    }

    pub fn with_config(runtime: Handle, config: ExportConfig) -> Self {
        Self {
            runtime,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// True when no run is in progress
    pub fn is_ready(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }

    /// Start a run; `false` means nothing was started.
    pub fn start(
        &self,
        request: ExportRequest,
        on_progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> bool {
        match self.try_start(request, on_progress, on_complete) {
            Ok(_) => true,
            Err(e) => {
                warn!("Export not started: {}", e);
                false
            }
        }
    }

    /// Start a run, reporting why it was refused
    pub fn try_start(
        &self,
        request: ExportRequest,
        on_progress: Option<ProgressCallback>,
        on_complete: Option<CompletionCallback>,
    ) -> Result<ExportHandle, StartError> {
        if !self.is_ready() {
            return Err(StartError::Busy);
        }

        let (source_root, dest_root) = validate_roots(&request)?;
        let encoding = Encoding::for_label(self.config.default_encoding.as_bytes())
            .ok_or_else(|| StartError::UnknownEncoding(self.config.default_encoding.clone()))?;

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StartError::Busy);
        }
        let guard = RunGuard(Arc::clone(&self.running));

        let run_id = Uuid::new_v4();
        let worker_count = clamp_worker_count(request.worker_count);
        let (completion_tx, completion_rx) = oneshot::channel();

        info!(
            "Starting export run {}: {:?} -> {:?} with {} workers",
            run_id, source_root, dest_root, worker_count
        );

        let run = ExportRun {
            run_id,
            context: JobContext {
                source_root,
                dest_root,
                tag: request.tag,
                encoding,
                matcher: PathMatcher::new(self.config.extensions.iter().cloned()),
            },
            worker_count,
            config: self.config.clone(),
            runtime: self.runtime.clone(),
        };

        self.runtime.spawn(async move {
            let outcome = run.supervise(on_progress).await;

            if let Some(on_complete) = on_complete {
                on_complete(&outcome);
            }

            drop(guard);
            let _ = completion_tx.send(outcome);
        });

        Ok(ExportHandle {
            run_id,
            completion: completion_rx,
        })
    }
}

/// Check both roots and resolve them to canonical absolute paths
fn validate_roots(request: &ExportRequest) -> Result<(PathBuf, PathBuf), StartError> {
    if !is_valid_directory(&request.source_root) {
        return Err(StartError::InvalidSource(request.source_root.clone()));
    }

    if !is_valid_directory(&request.dest_root) {
        return Err(StartError::InvalidDestination(request.dest_root.clone()));
    }

    let source_root = request
        .source_root
        .canonicalize()
        .map_err(|_| StartError::InvalidSource(request.source_root.clone()))?;
    let dest_root = request
        .dest_root
        .canonicalize()
        .map_err(|_| StartError::InvalidDestination(request.dest_root.clone()))?;

    if source_root == dest_root {
        return Err(StartError::SameDirectory(source_root));
    }

    Ok((source_root, dest_root))
}

struct ExportRun {
    run_id: Uuid,
    context: JobContext,
    worker_count: usize,
    config: ExportConfig,
    runtime: Handle,
}

impl ExportRun {
    async fn supervise(self, on_progress: Option<ProgressCallback>) -> ExportOutcome {
        let started_at = Utc::now();
        let pool = WorkerPool::spawn(&self.runtime, self.worker_count, self.context.clone());

        let source_root = self.context.source_root.clone();
        let exclude = self
            .context
            .dest_root
            .starts_with(&source_root)
            .then(|| self.context.dest_root.clone());
        let files_only = self.config.skip_directories;
        let sender = pool.sender();

        let enumeration = tokio::task::spawn_blocking(move || {
            for path in walk_entries(&source_root, exclude.as_deref(), files_only) {
                if !sender.submit(FileJob::new(path)) {
                    break;
                }
            }
        });

        if let Err(e) = enumeration.await {
            error!("Enumeration of run {} aborted: {}", self.run_id, e);
        }

        let total_discovered = pool.submitted();
        info!("Run {} discovered {} entries", self.run_id, total_discovered);

        let period = self.config.poll_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let remaining = pool.unfinished();
            if let Some(on_progress) = &on_progress {
                on_progress(total_discovered, remaining);
            }

            if remaining == 0 {
                break;
            }
        }

        let tally = pool.shutdown().await;
        let outcome = ExportOutcome::from_tally(self.run_id, total_discovered, tally, started_at);

        info!(
            "Export run {} completed. Copied: {}, Untagged: {}, Errors: {}",
            self.run_id,
            outcome.copied,
            outcome.untagged,
            outcome.failures.len()
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.extensions.len(), 10);
        assert!(config.extensions.contains(&"inl".to_string()));
        assert_eq!(config.poll_interval, Duration::from_millis(33));
        assert!(!config.skip_directories);
        assert_eq!(config.default_encoding, "shift_jis");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unknown_encoding_is_refused() {
        let source = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let config = ExportConfig {
            default_encoding: "not-a-code-page".to_string(),
            ..ExportConfig::default()
        };
        let session = ExportSession::with_config(Handle::current(), config);

        let request = ExportRequest::new(source.path(), dest.path(), "x", 1);
        let result = session.try_start(request, None, None);

        assert!(matches!(result, Err(StartError::UnknownEncoding(_))));
        assert!(session.is_ready());
    }

    #[test]
    fn test_validate_roots_rejects_same_directory() {
        let dir = TempDir::new().unwrap();
        let request = ExportRequest::new(dir.path(), dir.path().join("."), "@EDITED", 1);

        assert!(matches!(
            validate_roots(&request),
            Err(StartError::SameDirectory(_))
        ));
    }

    #[test]
    fn test_validate_roots_rejects_missing_directories() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        let request = ExportRequest::new(&missing, dir.path(), "@EDITED", 1);
        assert!(matches!(
            validate_roots(&request),
            Err(StartError::InvalidSource(_))
        ));

        let request = ExportRequest::new(dir.path(), &missing, "@EDITED", 1);
        assert!(matches!(
            validate_roots(&request),
            Err(StartError::InvalidDestination(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_rejected_start_leaves_session_ready() {
        let dir = TempDir::new().unwrap();
        let session = ExportSession::new(Handle::current());

        assert!(!session.start(ExportRequest::new(dir.path(), dir.path(), "x", 1), None, None));
        assert!(session.is_ready());
    }
}
