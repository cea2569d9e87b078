//! Evaluation job record and its state machine.
//!
//! `Queued → Processing → {Completed | Failed}`. Completed and Failed are
//! terminal. Both stores (Postgres and in-memory) derive their guards from
//! [`JobStatus::predecessors`] so the edge set lives in exactly one place.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::evaluation::EvaluationResult;

/// Error message stored on a job that ran out of attempts.
pub const MAX_RETRIES_EXCEEDED: &str = "max retries exceeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// States a job may be in immediately before entering `self`.
    /// `Queued` has none: it is only ever produced by submission.
    pub fn predecessors(&self) -> &'static [JobStatus] {
        match self {
            JobStatus::Queued => &[],
            JobStatus::Processing => &[JobStatus::Queued],
            JobStatus::Completed => &[JobStatus::Processing],
            JobStatus::Failed => &[JobStatus::Queued, JobStatus::Processing],
        }
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        next.predecessors().contains(self)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid job status: {s}"))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// The two documents a job evaluates, already extracted to text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobInput {
    pub cv_file: Option<String>,
    pub project_file: Option<String>,
    pub cv_content: String,
    pub project_content: String,
}

impl JobInput {
    pub fn from_text(cv_content: impl Into<String>, project_content: impl Into<String>) -> Self {
        Self {
            cv_file: None,
            project_file: None,
            cv_content: cv_content.into(),
            project_content: project_content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub input: JobInput,
    pub result: Option<EvaluationResult>,
    pub error_message: Option<String>,
    pub retry_count: u32,
}

impl Job {
    pub fn new(input: JobInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            input,
            result: None,
            error_message: None,
            retry_count: 0,
        }
    }

    fn guard(&self, to: JobStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                to,
            })
        }
    }

    /// Queued → Processing.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.guard(JobStatus::Processing)?;
        self.status = JobStatus::Processing;
        self.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Processing → Completed, storing the result.
    pub fn complete(
        &mut self,
        result: EvaluationResult,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.guard(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error_message = None;
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Queued/Processing → Failed, storing the error message.
    pub fn fail(&mut self, message: &str, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.guard(JobStatus::Failed)?;
        self.status = JobStatus::Failed;
        self.result = None;
        self.error_message = Some(message.to_string());
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Not a status transition; allowed in any state.
    pub fn increment_retry(&mut self, now: DateTime<Utc>) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.updated_at = now;
    }

    /// Completed ⇔ result, Failed ⇔ error, never both, started ≤ completed.
    pub fn is_consistent(&self) -> bool {
        let outcome_ok = match self.status {
            JobStatus::Completed => self.result.is_some() && self.error_message.is_none(),
            JobStatus::Failed => self.error_message.is_some() && self.result.is_none(),
            JobStatus::Queued | JobStatus::Processing => {
                self.result.is_none() && self.error_message.is_none()
            }
        };
        let times_ok = match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => started <= completed,
            _ => true,
        };
        outcome_ok && times_ok
    }
}
