use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::scoring::{score_report, ScoreReport};
use crate::jobs::{submit_evaluation, JobFilter, DEFAULT_LIST_LIMIT};
use crate::models::evaluation::EvaluationResult;
use crate::models::job::{Job, JobInput, JobStatus};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct EvaluateRequest {
    pub cv_file: String,
    pub project_file: String,
}

#[derive(Serialize)]
pub struct EvaluateResponse {
    pub id: Uuid,
    pub status: JobStatus,
}

/// POST /api/v1/evaluate
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<(StatusCode, Json<EvaluateResponse>), AppError> {
    let cv_content = state.documents.read_text(&req.cv_file).await?;
    let project_content = state.documents.read_text(&req.project_file).await?;

    let input = JobInput {
        cv_file: Some(req.cv_file),
        project_file: Some(req.project_file),
        cv_content,
        project_content,
    };
    let job = submit_evaluation(state.jobs.as_ref(), state.queue.as_ref(), input).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EvaluateResponse {
            id: job.id,
            status: job.status,
        }),
    ))
}

#[derive(Serialize)]
pub struct ResultResponse {
    pub id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EvaluationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScoreReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn load_job(state: &AppState, id: Uuid) -> Result<Job, AppError> {
    state
        .jobs
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// GET /api/v1/result/:id
/// Failed jobs answer 500 with the stored error message.
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ResultResponse>), AppError> {
    let job = load_job(&state, id).await?;

    let status = match job.status {
        JobStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    let report = job.result.as_ref().map(score_report);

    Ok((
        status,
        Json(ResultResponse {
            id: job.id,
            status: job.status,
            result: job.result,
            report,
            error: job.error_message,
        }),
    ))
}

#[derive(Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub cv_file: Option<String>,
    pub project_file: Option<String>,
    pub retry_count: u32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            cv_file: job.input.cv_file,
            project_file: job.input.project_file,
            retry_count: job.retry_count,
            error: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
        }
    }
}

/// GET /api/v1/job/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, AppError> {
    Ok(Json(load_job(&state, id).await?.into()))
}

#[derive(Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/v1/jobs?status=&limit=&offset=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    let filter = JobFilter {
        status,
        limit: params.limit.unwrap_or(DEFAULT_LIST_LIMIT),
        offset: params.offset.unwrap_or(0),
    }
    .normalized();

    let jobs = state.jobs.list_with_filter(filter).await?;
    Ok(Json(ListJobsResponse {
        jobs: jobs.into_iter().map(JobResponse::from).collect(),
        limit: filter.limit,
        offset: filter.offset,
    }))
}

#[derive(Serialize)]
pub struct QueueStatusResponse {
    pub queue_length: usize,
    pub pending_jobs: usize,
    pub status: &'static str,
}

/// GET /api/v1/queue
pub async fn handle_queue_status(
    State(state): State<AppState>,
) -> Result<Json<QueueStatusResponse>, AppError> {
    let queue_length = state.queue.len().await?;
    let pending_jobs = state.jobs.list_pending().await?.len();
    Ok(Json(QueueStatusResponse {
        queue_length,
        pending_jobs,
        status: "running",
    }))
}

/// DELETE /api/v1/queue
pub async fn handle_clear_queue(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.queue.clear().await?;
    tracing::warn!("Work queue cleared");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct RemoveResponse {
    pub id: Uuid,
    pub removed: usize,
}

/// DELETE /api/v1/queue/:id
pub async fn handle_remove_from_queue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RemoveResponse>, AppError> {
    let removed = state.queue.remove(id).await?;
    Ok(Json(RemoveResponse { id, removed }))
}
