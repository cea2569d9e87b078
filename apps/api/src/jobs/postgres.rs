use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::{JobFilter, JobStore};
use crate::db::StoreError;
use crate::models::evaluation::EvaluationResult;
use crate::models::job::{Job, JobInput, JobStatus, TransitionError};

const JOB_COLUMNS: &str = "id, status, cv_file, project_file, cv_content, project_content, \
    result, error_message, retry_count, created_at, updated_at, started_at, completed_at";

/// Raw `evaluation_jobs` row.
#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    status: String,
    cv_file: Option<String>,
    project_file: Option<String>,
    cv_content: String,
    project_content: String,
    result: Option<Json<EvaluationResult>>,
    error_message: Option<String>,
    retry_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|reason| StoreError::Corrupt { id: row.id, reason })?;
        let retry_count = u32::try_from(row.retry_count).map_err(|_| StoreError::Corrupt {
            id: row.id,
            reason: format!("negative retry_count {}", row.retry_count),
        })?;

        Ok(Job {
            id: row.id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            input: JobInput {
                cv_file: row.cv_file,
                project_file: row.project_file,
                cv_content: row.cv_content,
                project_content: row.project_content,
            },
            result: row.result.map(|Json(r)| r),
            error_message: row.error_message,
            retry_count,
        })
    }
}

fn predecessor_names(to: JobStatus) -> Vec<&'static str> {
    to.predecessors().iter().map(JobStatus::as_str).collect()
}

#[derive(Clone)]
pub struct PgJobStore {
    db: PgPool,
}

impl PgJobStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Explains a guarded UPDATE that matched no row.
    async fn rejected(&self, id: Uuid, to: JobStatus) -> StoreError {
        match self.get_by_id(id).await {
            Ok(Some(job)) => StoreError::InvalidTransition {
                id,
                source: TransitionError {
                    from: job.status,
                    to,
                },
            },
            Ok(None) => StoreError::NotFound(id),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, job: &Job) -> Result<Uuid, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_jobs
                (id, status, cv_file, project_file, cv_content, project_content,
                 retry_count, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(&job.input.cv_file)
        .bind(&job.input.project_file)
        .bind(&job.input.cv_content)
        .bind(&job.input.project_content)
        .bind(job.retry_count as i32)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.db)
        .await?;
        Ok(job.id)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM evaluation_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(Job::try_from).transpose()
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, StoreError> {
        if status.is_terminal() {
            return Err(self.rejected(id, status).await);
        }

        let row: Option<JobRow> = sqlx::query_as(&format!(
            r#"
            UPDATE evaluation_jobs
            SET status = $2,
                started_at = CASE WHEN $2 = 'processing' THEN now() ELSE started_at END,
                updated_at = now()
            WHERE id = $1 AND status = ANY($3)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(predecessor_names(status))
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => Err(self.rejected(id, status).await),
        }
    }

    async fn update_result(
        &self,
        id: Uuid,
        result: &EvaluationResult,
    ) -> Result<Job, StoreError> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            r#"
            UPDATE evaluation_jobs
            SET status = 'completed',
                result = $2,
                error_message = NULL,
                completed_at = now(),
                updated_at = now()
            WHERE id = $1 AND status = ANY($3)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json(result))
        .bind(predecessor_names(JobStatus::Completed))
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => Err(self.rejected(id, JobStatus::Completed).await),
        }
    }

    async fn update_error(&self, id: Uuid, message: &str) -> Result<Job, StoreError> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            r#"
            UPDATE evaluation_jobs
            SET status = 'failed',
                error_message = $2,
                result = NULL,
                completed_at = now(),
                updated_at = now()
            WHERE id = $1 AND status = ANY($3)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(message)
        .bind(predecessor_names(JobStatus::Failed))
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Job::try_from(row),
            None => Err(self.rejected(id, JobStatus::Failed).await),
        }
    }

    async fn increment_retry(&self, id: Uuid) -> Result<u32, StoreError> {
        let count: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE evaluation_jobs
            SET retry_count = retry_count + 1, updated_at = now()
            WHERE id = $1
            RETURNING retry_count
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let count = count.ok_or(StoreError::NotFound(id))?;
        u32::try_from(count).map_err(|_| StoreError::Corrupt {
            id,
            reason: format!("negative retry_count {count}"),
        })
    }

    async fn list_pending(&self) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM evaluation_jobs
            WHERE status IN ('queued', 'processing')
            ORDER BY created_at ASC
            "#
        ))
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn list_with_filter(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError> {
        let filter = filter.normalized();
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM evaluation_jobs
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }
}
