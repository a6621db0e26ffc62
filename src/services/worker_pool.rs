use crate::models::{FileJob, JobOutcome, JobTally, WorkItem};
use crate::utils::{contains_tag_with, copy_into, destination_for, PathMatcher};
use encoding_rs::Encoding;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Everything a worker needs to turn a `FileJob` into a `JobOutcome`
#[derive(Debug, Clone)]
pub struct JobContext {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub tag: String,
    pub encoding: &'static Encoding,
    pub matcher: PathMatcher,
}

/// Match, scan and copy a single path. Never fails; errors become `JobOutcome::Failed`.
pub fn process_job(context: &JobContext, job: &FileJob) -> JobOutcome {
    let path = job.path();

    if !context.matcher.matches(path) {
        return JobOutcome::Rejected;
    }

    if !contains_tag_with(path, &context.tag, context.encoding) {
        return JobOutcome::Untagged;
    }

    let directory = match destination_for(&context.source_root, &context.dest_root, path) {
        Ok(directory) => directory,
        Err(e) => {
            return JobOutcome::Failed {
                source: path.to_path_buf(),
                destination: None,
                error: e.to_string(),
            }
        }
    };

    match copy_into(path, &directory) {
        Ok(destination) => {
            debug!("Exported {:?} -> {:?}", path, destination);
            JobOutcome::Copied {
                source: path.to_path_buf(),
                destination,
            }
        }
        Err(e) => {
            warn!("Failed to export {:?}: {:#}", path, e);
            JobOutcome::Failed {
                source: path.to_path_buf(),
                destination: Some(directory),
                error: format!("{:#}", e),
            }
        }
    }
}

/// Counters shared between the queue producers and the workers
#[derive(Debug, Default)]
struct QueueCounters {
    submitted: AtomicUsize,
    unfinished: AtomicUsize,
}

/// Producer side of the job queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct JobSender {
    sender: mpsc::UnboundedSender<WorkItem>,
    counters: Arc<QueueCounters>,
}

impl JobSender {
    /// Queue a job. Returns `false` once every worker has gone away.
    pub fn submit(&self, job: FileJob) -> bool {
        self.counters.unfinished.fetch_add(1, Ordering::SeqCst);

        if self.sender.send(WorkItem::Job(job)).is_err() {
            self.counters.unfinished.fetch_sub(1, Ordering::SeqCst);
            return false;
        }

        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Fixed set of workers draining one shared queue.
///
/// `unfinished()` counts jobs that are queued or still being processed, so it
/// only reaches zero once every submitted copy has physically completed.
pub struct WorkerPool {
    sender: JobSender,
    workers: Vec<JoinHandle<JobTally>>,
}

impl WorkerPool {
    pub fn spawn(runtime: &Handle, worker_count: usize, context: JobContext) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(QueueCounters::default());
        let context = Arc::new(context);

        let workers = (0..worker_count.max(1))
            .map(|id| {
                runtime.spawn(run_worker(
                    id,
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                    Arc::clone(&context),
                ))
            })
            .collect();

        Self {
            sender: JobSender { sender, counters },
            workers,
        }
    }

    pub fn sender(&self) -> JobSender {
        self.sender.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn submitted(&self) -> usize {
        self.sender.counters.submitted.load(Ordering::SeqCst)
    }

    pub fn unfinished(&self) -> usize {
        self.sender.counters.unfinished.load(Ordering::SeqCst)
    }

    /// Send one shutdown signal per worker, close the queue and join every
    /// worker. Returns the merged tally of all processed jobs.
    pub async fn shutdown(self) -> JobTally {
        let Self { sender, workers } = self;

        for _ in 0..workers.len() {
            if sender.sender.send(WorkItem::Shutdown).is_err() {
                break;
            }
        }
        drop(sender);

        let mut tally = JobTally::default();
        for (id, worker) in workers.into_iter().enumerate() {
            match worker.await {
                Ok(worker_tally) => tally.merge(worker_tally),
                Err(e) => error!("Worker {} terminated abnormally: {}", id, e),
            }
        }

        tally
    }
}

async fn run_worker(
    id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
    counters: Arc<QueueCounters>,
    context: Arc<JobContext>,
) -> JobTally {
    let mut tally = JobTally::default();

    loop {
        let item = receiver.lock().await.recv().await;

        let job = match item {
            Some(WorkItem::Job(job)) => job,
            Some(WorkItem::Shutdown) | None => break,
        };

        let source = job.path.clone();
        let job_context = Arc::clone(&context);
        let outcome = tokio::task::spawn_blocking(move || process_job(&job_context, &job))
            .await
            .unwrap_or_else(|e| {
                error!("Worker {} failed while processing {:?}: {}", id, source, e);
                JobOutcome::Failed {
                    source,
                    destination: None,
                    error: format!("job aborted: {}", e),
                }
            });

        tally.record(outcome);
        counters.unfinished.fetch_sub(1, Ordering::SeqCst);
    }

    debug!("Worker {} stopped after {} jobs", id, tally.jobs());
    tally
}
