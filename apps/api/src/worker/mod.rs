//! Worker Loop: the single consumer of the work queue.
//!
//! Runs as one owned task. Each popped id is re-read from the job store,
//! skipped when terminal, failed when its retry budget is spent, otherwise
//! claimed (`Queued → Processing`) and evaluated. A failed evaluation marks
//! the job Failed and bumps its retry counter; nothing is re-enqueued.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::db::StoreError;
use crate::evaluation::CandidateEvaluator;
use crate::jobs::JobStore;
use crate::models::job::{JobStatus, MAX_RETRIES_EXCEEDED};
use crate::queue::WorkQueue;


#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// A job whose retry counter reached this is failed without running.
    pub max_retries: u32,
    /// Sleep after an infrastructure error from the queue.
    pub queue_error_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            queue_error_backoff: Duration::from_secs(5),
        }
    }
}

/// What happened to one popped id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Evaluation failed; the job is Failed and its retry counter was bumped.
    Failed,
    RetryBudgetExhausted,
    /// Redelivery of a Completed/Failed job. Nothing changed.
    AlreadyTerminal(JobStatus),
    /// Another consumer claimed the job first.
    ClaimedElsewhere,
    NotFound,
}

pub struct Worker {
    jobs: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    evaluator: Arc<dyn CandidateEvaluator>,
    config: WorkerConfig,
}

/// Owner of a running worker task.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signals the worker and waits for it to exit. A job already in hand is
    /// finished first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Worker task ended abnormally: {e}");
        }
    }
}

impl Worker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
        evaluator: Arc<dyn CandidateEvaluator>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            jobs,
            queue,
            evaluator,
            config,
        }
    }

    pub fn spawn(self) -> WorkerHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        WorkerHandle { shutdown: tx, task }
    }

    /// Pops and processes ids until `shutdown` flips or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Worker started (max_retries: {}, queue backoff: {:?})",
            self.config.max_retries, self.config.queue_error_backoff
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let popped = tokio::select! {
                _ = shutdown.changed() => break,
                popped = self.queue.pop() => popped,
            };

            match popped {
                Ok(id) => {
                    info!("Dequeued job {id}");
                    let span = info_span!("job", %id);
                    match self.process_job(id).instrument(span).await {
                        Ok(outcome) => info!("Job {id} finished: {outcome:?}"),
                        Err(e) => error!("Job {id} could not be processed: {e}"),
                    }
                }
                Err(e) if e.needs_backoff() => {
                    error!(
                        "Queue error: {e}, retrying in {:?}",
                        self.config.queue_error_backoff
                    );
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(self.config.queue_error_backoff) => {}
                    }
                }
                Err(e) => warn!("Skipping queue entry: {e}"),
            }
        }

        info!("Worker stopped");
    }

    /// One pass over a popped id. Store errors surface; evaluation errors are
    /// recorded on the job.
    pub async fn process_job(&self, id: Uuid) -> Result<JobOutcome, WorkerError> {
        let Some(job) = self.jobs.get_by_id(id).await? else {
            warn!("Job {id} not found, dropping");
            return Ok(JobOutcome::NotFound);
        };

        if job.status.is_terminal() {
            info!("Job {id} already {}, skipping redelivery", job.status);
            return Ok(JobOutcome::AlreadyTerminal(job.status));
        }

        if job.retry_count >= self.config.max_retries {
            warn!(
                "Job {id} exhausted its retry budget ({}/{})",
                job.retry_count, self.config.max_retries
            );
            self.jobs.update_error(id, MAX_RETRIES_EXCEEDED).await?;
            return Ok(JobOutcome::RetryBudgetExhausted);
        }

        let job = match self.jobs.update_status(id, JobStatus::Processing).await {
            Ok(job) => job,
            Err(StoreError::InvalidTransition { source, .. }) => {
                info!("Job {id} not claimable ({source}), skipping");
                return Ok(JobOutcome::ClaimedElsewhere);
            }
            Err(e) => return Err(e.into()),
        };
        info!("Job {id} → processing (attempt {})", job.retry_count + 1);

        match self.evaluator.evaluate(&job.input).await {
            Ok(result) => {
                let job = self.jobs.update_result(id, &result).await?;
                debug_assert!(job.is_consistent());
                info!(
                    "Job {id} → completed (match_rate: {}, project_score: {})",
                    result.cv_match_rate, result.project_score
                );
                Ok(JobOutcome::Completed)
            }
            Err(e) => {
                let message = e.to_string();
                match e.stage() {
                    Some(stage) => error!("Job {id} failed in stage {stage}: {message}"),
                    None => error!("Job {id} failed before the first stage: {message}"),
                }
                self.jobs.update_error(id, &message).await?;
                let retries = self.jobs.increment_retry(id).await?;
                info!("Job {id} → failed (retry_count: {retries})");
                Ok(JobOutcome::Failed)
            }
        }
    }
}
