use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::evaluation::decode::{decode_structured, Decoded};
use crate::evaluation::prompts::{
    render, EXTRACT_CV_TEMPLATE, SCORE_CV_TEMPLATE, SCORE_PROJECT_TEMPLATE, SUMMARY_TEMPLATE,
};
use crate::evaluation::retry::{with_backoff, RetryPolicy};
use crate::evaluation::scoring::{cv_match_rate, project_composite};
use crate::evaluation::{CandidateEvaluator, EvaluationError, Stage, StageError};
use crate::llm_client::prompts::STAGE_TEMPERATURE;
use crate::llm_client::LlmService;
use crate::models::evaluation::{
    CvBreakdown, CvScores, CvWeights, EvaluationResult, ProjectBreakdown, ProjectScores,
    ProjectWeights,
};
use crate::models::job::JobInput;
use crate::rag::ContextRetriever;

// ────────────────────────────────────────────────────────────────────────────
// Stage payloads
// ────────────────────────────────────────────────────────────────────────────

/// Structured candidate profile produced by the extract stage.
///
/// Skills, experience, projects and achievements are required: a reply
/// without them is not a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvProfile {
    pub technical_skills: Vec<String>,
    pub experience_years: f64,
    pub projects: Vec<ProfileProject>,
    pub achievements: Vec<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CvAssessment {
    technical_skills_score: f64,
    experience_level_score: f64,
    achievements_score: f64,
    cultural_fit_score: f64,
    feedback: String,
}

impl CvAssessment {
    fn scores(&self) -> CvScores {
        CvScores {
            technical_skills: self.technical_skills_score,
            experience_level: self.experience_level_score,
            achievements: self.achievements_score,
            cultural_fit: self.cultural_fit_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectAssessment {
    correctness_score: f64,
    code_quality_score: f64,
    resilience_score: f64,
    documentation_score: f64,
    creativity_score: f64,
    feedback: String,
}

impl ProjectAssessment {
    fn scores(&self) -> ProjectScores {
        ProjectScores {
            correctness: self.correctness_score,
            code_quality: self.code_quality_score,
            resilience: self.resilience_score,
            documentation: self.documentation_score,
            creativity: self.creativity_score,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluator
// ────────────────────────────────────────────────────────────────────────────

/// LLM-backed [`CandidateEvaluator`]. Stages run strictly in order; each LLM
/// call gets its own backoff budget from `retry`.
pub struct Evaluator {
    llm: Arc<dyn LlmService>,
    retriever: ContextRetriever,
    retry: RetryPolicy,
    cv_weights: CvWeights,
    project_weights: ProjectWeights,
}

impl Evaluator {
    pub fn new(llm: Arc<dyn LlmService>, retriever: ContextRetriever, retry: RetryPolicy) -> Self {
        Self {
            llm,
            retriever,
            retry,
            cv_weights: CvWeights::STANDARD,
            project_weights: ProjectWeights::STANDARD,
        }
    }

    async fn structured<T: DeserializeOwned>(
        &self,
        stage: Stage,
        prompt: &str,
    ) -> Result<T, EvaluationError> {
        let raw = with_backoff(self.retry, stage.as_str(), || {
            self.llm
                .generate_structured_completion(prompt, STAGE_TEMPERATURE)
        })
        .await
        .map_err(|e| stage_failed(stage, e.into()))?;

        match decode_structured::<T>(&raw) {
            Decoded::Parsed(value) => Ok(value),
            Decoded::Malformed { raw, reason } => {
                warn!("Stage {stage} returned malformed JSON ({reason}): {raw:.200}");
                Err(stage_failed(stage, StageError::Malformed { raw, reason }))
            }
        }
    }

    async fn extract(&self, cv_content: &str) -> Result<CvProfile, EvaluationError> {
        let prompt = render(EXTRACT_CV_TEMPLATE, &[("cv_content", cv_content)]);
        self.structured(Stage::Extract, &prompt).await
    }

    async fn score_cv(
        &self,
        profile: &CvProfile,
        context: &str,
    ) -> Result<CvAssessment, EvaluationError> {
        let profile_json = serde_json::to_string_pretty(profile).unwrap_or_default();
        let prompt = render(
            SCORE_CV_TEMPLATE,
            &[("context", context), ("cv_profile", profile_json.as_str())],
        );

        let assessment: CvAssessment = self.structured(Stage::ScoreCv, &prompt).await?;
        assessment
            .scores()
            .validate()
            .map_err(|e| stage_failed(Stage::ScoreCv, e.into()))?;
        require_feedback(Stage::ScoreCv, &assessment.feedback)?;
        Ok(assessment)
    }

    async fn score_project(
        &self,
        project_content: &str,
        context: &str,
    ) -> Result<ProjectAssessment, EvaluationError> {
        let prompt = render(
            SCORE_PROJECT_TEMPLATE,
            &[("context", context), ("project_content", project_content)],
        );

        let assessment: ProjectAssessment = self.structured(Stage::ScoreProject, &prompt).await?;
        assessment
            .scores()
            .validate()
            .map_err(|e| stage_failed(Stage::ScoreProject, e.into()))?;
        require_feedback(Stage::ScoreProject, &assessment.feedback)?;
        Ok(assessment)
    }

    async fn summarize(
        &self,
        cv: &CvAssessment,
        project: &ProjectAssessment,
    ) -> Result<String, EvaluationError> {
        let cv_json = serde_json::to_string_pretty(cv).unwrap_or_default();
        let project_json = serde_json::to_string_pretty(project).unwrap_or_default();
        let prompt = render(
            SUMMARY_TEMPLATE,
            &[("cv_evaluation", cv_json.as_str()), ("project_evaluation", project_json.as_str())],
        );

        let summary = with_backoff(self.retry, Stage::Summarize.as_str(), || {
            self.llm.generate_completion(&prompt, STAGE_TEMPERATURE)
        })
        .await
        .map_err(|e| stage_failed(Stage::Summarize, e.into()))?;

        Ok(summary.trim().to_string())
    }
}

#[async_trait]
impl CandidateEvaluator for Evaluator {
    async fn evaluate(&self, input: &JobInput) -> Result<EvaluationResult, EvaluationError> {
        let context = self
            .retriever
            .retrieve(&input.cv_content, &input.project_content)
            .await?
            .render();

        let profile = self.extract(&input.cv_content).await?;
        info!(
            "Stage extract done: {} skill(s), {} project(s)",
            profile.technical_skills.len(),
            profile.projects.len()
        );

        let cv = self.score_cv(&profile, &context).await?;
        let cv_scores = cv.scores();
        let match_rate = cv_match_rate(&cv_scores, &self.cv_weights);
        info!("Stage score_cv done: match_rate={match_rate}");

        let project = self.score_project(&input.project_content, &context).await?;
        let project_scores = project.scores();
        let project_score = project_composite(&project_scores, &self.project_weights);
        info!("Stage score_project done: project_score={project_score}");

        let overall_summary = self.summarize(&cv, &project).await?;
        info!("Stage summarize done");

        Ok(EvaluationResult {
            cv_match_rate: match_rate,
            cv_feedback: cv.feedback,
            project_score,
            project_feedback: project.feedback,
            overall_summary,
            cv_breakdown: CvBreakdown {
                scores: cv_scores,
                weights: self.cv_weights,
            },
            project_breakdown: ProjectBreakdown {
                scores: project_scores,
                weights: self.project_weights,
            },
        })
    }
}

fn stage_failed(stage: Stage, source: StageError) -> EvaluationError {
    EvaluationError::Stage { stage, source }
}

fn require_feedback(stage: Stage, feedback: &str) -> Result<(), EvaluationError> {
    if feedback.trim().is_empty() {
        return Err(stage_failed(
            stage,
            StageError::Malformed {
                raw: String::new(),
                reason: "feedback is empty".into(),
            },
        ));
    }
    Ok(())
}
