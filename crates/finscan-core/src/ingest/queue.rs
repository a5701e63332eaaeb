//! In-process task queue with a tokio worker pool and delayed retries.
//!
//! Jobs travel over an unbounded channel. Each worker takes one job at a
//! time and runs the blocking pipeline on the blocking thread pool. A
//! retryable failure is re-submitted after a linear backoff until the
//! retry budget is spent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::orchestrator::{Orchestrator, RunOutcome};
use crate::error::{FinscanError, QueueError};
use crate::models::config::PipelineConfig;

/// A unit of work: process one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    pub document_id: i64,
    /// Zero for the first run.
    pub attempt: u32,
}

impl Job {
    pub fn new(document_id: i64) -> Self {
        Self {
            document_id,
            attempt: 0,
        }
    }

    fn next_attempt(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }
}

/// Anything jobs can be submitted to.
pub trait JobSink: Send + Sync {
    fn submit(&self, job: Job) -> Result<(), QueueError>;
}

/// Bounded automatic retries with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: Duration::from_secs(config.retry_backoff_secs),
        }
    }

    /// Delay before re-running a job that failed on `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff * (attempt + 1)
    }

    pub fn should_retry(&self, attempt: u32, error: &FinscanError) -> bool {
        error.is_retryable() && attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

/// Jobs submitted or waiting on a retry timer but not yet finished.
#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn add(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Submission handle. Cloning is cheap; the queue closes once every
/// handle is dropped.
#[derive(Clone)]
pub struct TaskQueue {
    sender: mpsc::UnboundedSender<Job>,
    pending: Arc<Pending>,
}

impl TaskQueue {
    /// Create a queue and spawn `workers` worker tasks on the current runtime.
    pub fn spawn(
        orchestrator: Arc<Orchestrator>,
        workers: usize,
        policy: RetryPolicy,
    ) -> (Self, WorkerPool) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let pending = Arc::new(Pending::default());
        let workers = workers.max(1);

        let handles = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    receiver: receiver.clone(),
                    retry_sender: sender.downgrade(),
                    pending: pending.clone(),
                    orchestrator: orchestrator.clone(),
                    policy,
                };
                tokio::spawn(worker.run())
            })
            .collect();

        info!(
            "Started {} workers (max retries {}, backoff {:?})",
            workers, policy.max_retries, policy.backoff
        );
        (Self { sender, pending }, WorkerPool { handles })
    }

    /// Number of jobs not yet finished, including scheduled retries.
    pub fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }

    /// Wait until every submitted job and scheduled retry has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.pending.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl JobSink for TaskQueue {
    fn submit(&self, job: Job) -> Result<(), QueueError> {
        self.pending.add();
        self.sender.send(job).map_err(|_| {
            self.pending.done();
            QueueError::Closed
        })?;
        debug!("Queued document {} (attempt {})", job.document_id, job.attempt + 1);
        Ok(())
    }
}

/// Worker task handles.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Wait for every worker to exit. Workers exit once all queue handles are dropped.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

struct Worker {
    id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    retry_sender: mpsc::WeakUnboundedSender<Job>,
    pending: Arc<Pending>,
    orchestrator: Arc<Orchestrator>,
    policy: RetryPolicy,
}

impl Worker {
    async fn run(self) {
        loop {
            let job = self.receiver.lock().await.recv().await;
            let Some(job) = job else {
                debug!("Worker {} stopping: queue closed", self.id);
                break;
            };

            let orchestrator = self.orchestrator.clone();
            let result = tokio::task::spawn_blocking(move || {
                orchestrator.process_document(job.document_id, job.attempt)
            })
            .await;

            match result {
                Ok(Ok(RunOutcome::Skipped)) => debug!("Document {} was skipped", job.document_id),
                Ok(Ok(RunOutcome::Processed { .. })) => {}
                Ok(Err(e)) => self.handle_failure(job, &e),
                Err(e) => error!("Worker {} crashed on document {}: {}", self.id, job.document_id, e),
            }

            self.pending.done();
        }
    }

    fn handle_failure(&self, job: Job, error: &FinscanError) {
        if !error.is_retryable() {
            warn!("Document {} failed permanently: {}", job.document_id, error);
            return;
        }
        if !self.policy.should_retry(job.attempt, error) {
            error!(
                "Document {} failed after {} attempts, giving up",
                job.document_id,
                job.attempt + 1
            );
            return;
        }

        let delay = self.policy.delay_for(job.attempt);
        let retry = job.next_attempt();
        warn!(
            "Retrying document {} in {:?} (retry {} of {})",
            job.document_id, delay, retry.attempt, self.policy.max_retries
        );

        self.pending.add();
        let sender = self.retry_sender.clone();
        let pending = self.pending.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let sent = sender.upgrade().is_some_and(|s| s.send(retry).is_ok());
            if !sent {
                warn!("Queue closed, dropping retry of document {}", retry.document_id);
                pending.done();
            }
        });
    }
}
