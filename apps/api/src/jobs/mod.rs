//! Job Store: the single writer of job state.
//!
//! Every mutation is keyed by job id and applied atomically. Transitions into
//! a status are only accepted from that status's
//! [`predecessors`](crate::models::job::JobStatus::predecessors); terminal
//! states are reached only through `update_result` / `update_error`.

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod submit;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::evaluation::EvaluationResult;
use crate::models::job::{Job, JobStatus};

pub use postgres::PgJobStore;
pub use submit::{submit_evaluation, SubmitError};

pub const DEFAULT_LIST_LIMIT: i64 = 10;
pub const MAX_LIST_LIMIT: i64 = 100;

/// Paging and status filter for [`JobStore::list_with_filter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for JobFilter {
    fn default() -> Self {
        Self {
            status: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl JobFilter {
    /// Clamps limit to `1..=MAX_LIST_LIMIT` and offset to `>= 0`.
    pub fn normalized(self) -> Self {
        Self {
            status: self.status,
            limit: self.limit.clamp(1, MAX_LIST_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &Job) -> Result<Uuid, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Non-terminal transitions only (in practice `Queued → Processing`,
    /// which stamps `started_at`).
    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<Job, StoreError>;

    /// `Processing → Completed`.
    async fn update_result(&self, id: Uuid, result: &EvaluationResult)
        -> Result<Job, StoreError>;

    /// `Queued | Processing → Failed`.
    async fn update_error(&self, id: Uuid, message: &str) -> Result<Job, StoreError>;

    /// Bumps the retry counter in any state. Returns the new count.
    async fn increment_retry(&self, id: Uuid) -> Result<u32, StoreError>;

    /// Queued and Processing jobs, oldest first.
    async fn list_pending(&self) -> Result<Vec<Job>, StoreError>;

    /// Newest first.
    async fn list_with_filter(&self, filter: JobFilter) -> Result<Vec<Job>, StoreError>;
}
