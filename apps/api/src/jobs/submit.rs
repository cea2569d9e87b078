//! Submission path: validate, persist as Queued, hand the id to the worker.

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::StoreError;
use crate::jobs::JobStore;
use crate::llm_client::prepare_embedding_input;
use crate::models::job::{Job, JobInput};
use crate::queue::{QueueError, WorkQueue};

/// Error message stored on a job whose id never made it onto the queue.
pub const ENQUEUE_FAILED: &str = "failed to enqueue job";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0} document is empty")]
    EmptyDocument(&'static str),

    #[error("{kind} document is invalid: {reason}")]
    InvalidDocument { kind: &'static str, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to enqueue job {id}: {source}")]
    Enqueue {
        id: Uuid,
        #[source]
        source: QueueError,
    },
}

/// Creates a Queued job and pushes its id. Does not wait for processing.
///
/// A job whose push fails is marked Failed right away so that nothing sits in
/// Queued with no queue entry behind it.
pub async fn submit_evaluation(
    store: &dyn JobStore,
    queue: &dyn WorkQueue,
    input: JobInput,
) -> Result<Job, SubmitError> {
    check_document("cv", &input.cv_content)?;
    check_document("project", &input.project_content)?;

    let job = Job::new(input);
    let id = store.create(&job).await?;

    if let Err(source) = queue.push(id).await {
        error!("Failed to enqueue job {id}: {source}");
        if let Err(e) = store.update_error(id, ENQUEUE_FAILED).await {
            error!("Failed to mark unqueued job {id} as failed: {e}");
        }
        return Err(SubmitError::Enqueue { id, source });
    }

    info!("Job {id} submitted");
    Ok(job)
}

/// Applies the embedding input rules up front, so text the retriever would
/// refuse never becomes a job.
fn check_document(kind: &'static str, text: &str) -> Result<(), SubmitError> {
    if text.trim().is_empty() {
        return Err(SubmitError::EmptyDocument(kind));
    }
    prepare_embedding_input(text).map_err(|e| SubmitError::InvalidDocument {
        kind,
        reason: e.to_string(),
    })?;
    Ok(())
}
