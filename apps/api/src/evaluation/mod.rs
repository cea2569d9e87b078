//! Evaluation Orchestrator: retrieval followed by four sequential LLM stages
//! (extract, score CV, score project, summarize). Any failure aborts the run;
//! a partial result is never returned.

pub mod decode;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod scoring;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::evaluation::retry::Exhausted;
use crate::evaluation::scoring::ScoringError;
use crate::models::evaluation::EvaluationResult;
use crate::models::job::JobInput;
use crate::rag::RagError;

pub use orchestrator::Evaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    ScoreCv,
    ScoreProject,
    Summarize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::ScoreCv => "score_cv",
            Stage::ScoreProject => "score_project",
            Stage::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] Exhausted),

    /// `raw` is kept for logs; only the reason reaches the job record.
    #[error("malformed response: {reason}")]
    Malformed { raw: String, reason: String },

    #[error(transparent)]
    Score(#[from] ScoringError),
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("context retrieval failed: {0}")]
    Retrieval(#[from] RagError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

impl EvaluationError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EvaluationError::Stage { stage, .. } => Some(*stage),
            EvaluationError::Retrieval(_) => None,
        }
    }
}

/// The seam the worker drives. Held as `Arc<dyn CandidateEvaluator>` so the
/// worker can be tested against a stub.
#[async_trait]
pub trait CandidateEvaluator: Send + Sync {
    async fn evaluate(&self, input: &JobInput) -> Result<EvaluationResult, EvaluationError>;
}
