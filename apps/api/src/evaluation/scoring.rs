//! Scoring utilities: pure, deterministic functions over sub-score sets.
//!
//! Composites are rounded to two decimals. The CV match rate lives on 0–1;
//! every other composite stays on the 0–5 scale of its inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::evaluation::{
    CvScores, CvWeights, EvaluationResult, ProjectScores, ProjectWeights,
};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 5.0;
/// Share of the CV composite in the overall candidate score.
pub const OVERALL_CV_WEIGHT: f64 = 0.6;
/// Share of the project composite in the overall candidate score.
pub const OVERALL_PROJECT_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("{field} must be between 0 and 5, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rejects NaN and anything outside [0, 5].
pub fn validate_score(field: &'static str, value: f64) -> Result<f64, ScoringError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(value)
    } else {
        Err(ScoringError::OutOfRange { field, value })
    }
}

impl CvScores {
    pub fn validate(&self) -> Result<(), ScoringError> {
        validate_score("technical_skills", self.technical_skills)?;
        validate_score("experience_level", self.experience_level)?;
        validate_score("achievements", self.achievements)?;
        validate_score("cultural_fit", self.cultural_fit)?;
        Ok(())
    }
}

impl ProjectScores {
    pub fn validate(&self) -> Result<(), ScoringError> {
        validate_score("correctness", self.correctness)?;
        validate_score("code_quality", self.code_quality)?;
        validate_score("resilience", self.resilience)?;
        validate_score("documentation", self.documentation)?;
        validate_score("creativity", self.creativity)?;
        Ok(())
    }
}

fn cv_weighted_sum(scores: &CvScores, weights: &CvWeights) -> f64 {
    scores.technical_skills * weights.technical_skills
        + scores.experience_level * weights.experience_level
        + scores.achievements * weights.achievements
        + scores.cultural_fit * weights.cultural_fit
}

/// Weighted CV composite on the 0–5 scale.
pub fn cv_composite(scores: &CvScores, weights: &CvWeights) -> f64 {
    round2(cv_weighted_sum(scores, weights))
}

/// Weighted CV mean divided by 5: the 0–1 "match rate".
pub fn cv_match_rate(scores: &CvScores, weights: &CvWeights) -> f64 {
    round2(cv_weighted_sum(scores, weights) / MAX_SCORE)
}

/// Weighted project composite, already on the 0–5 scale.
pub fn project_composite(scores: &ProjectScores, weights: &ProjectWeights) -> f64 {
    round2(
        scores.correctness * weights.correctness
            + scores.code_quality * weights.code_quality
            + scores.resilience * weights.resilience
            + scores.documentation * weights.documentation
            + scores.creativity * weights.creativity,
    )
}

/// 0.6 · CV composite + 0.4 · project composite, both on 0–5.
pub fn overall_composite(cv: f64, project: f64) -> f64 {
    round2(cv * OVERALL_CV_WEIGHT + project * OVERALL_PROJECT_WEIGHT)
}

// ────────────────────────────────────────────────────────────────────────────
// Interpretation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreLabel {
    Excellent,
    VeryGood,
    Good,
    Average,
    BelowAverage,
    Poor,
}

impl ScoreLabel {
    /// Lower bounds are inclusive: 4.5 is Excellent.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.5 {
            ScoreLabel::Excellent
        } else if score >= 4.0 {
            ScoreLabel::VeryGood
        } else if score >= 3.5 {
            ScoreLabel::Good
        } else if score >= 3.0 {
            ScoreLabel::Average
        } else if score >= 2.5 {
            ScoreLabel::BelowAverage
        } else {
            ScoreLabel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::VeryGood => "Very Good",
            ScoreLabel::Good => "Good",
            ScoreLabel::Average => "Average",
            ScoreLabel::BelowAverage => "Below Average",
            ScoreLabel::Poor => "Poor",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Highly recommended",
            ScoreLabel::VeryGood => "Strong candidate",
            ScoreLabel::Good => "Solid candidate",
            ScoreLabel::Average => "Consider with reservations",
            ScoreLabel::BelowAverage => "Not recommended",
            ScoreLabel::Poor => "Not suitable",
        }
    }
}

/// Human-facing digest of a completed evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub overall_score: f64,
    pub overall_label: &'static str,
    pub recommendation: &'static str,
    pub cv_composite: f64,
    pub cv_match_rate: f64,
    pub project_score: f64,
}

pub fn score_report(result: &EvaluationResult) -> ScoreReport {
    let cv = cv_composite(&result.cv_breakdown.scores, &result.cv_breakdown.weights);
    let overall = overall_composite(cv, result.project_score);
    let label = ScoreLabel::from_score(overall);
    ScoreReport {
        overall_score: overall,
        overall_label: label.as_str(),
        recommendation: label.recommendation(),
        cv_composite: cv,
        cv_match_rate: result.cv_match_rate,
        project_score: result.project_score,
    }
}
