use serde::{Deserialize, Serialize};

/// CV sub-scores, each on the 0–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvScores {
    pub technical_skills: f64,
    pub experience_level: f64,
    pub achievements: f64,
    pub cultural_fit: f64,
}

/// Weights combining [`CvScores`]. Sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvWeights {
    pub technical_skills: f64,
    pub experience_level: f64,
    pub achievements: f64,
    pub cultural_fit: f64,
}

impl CvWeights {
    pub const STANDARD: CvWeights = CvWeights {
        technical_skills: 0.40,
        experience_level: 0.25,
        achievements: 0.20,
        cultural_fit: 0.15,
    };

    pub fn total(&self) -> f64 {
        self.technical_skills + self.experience_level + self.achievements + self.cultural_fit
    }
}

impl Default for CvWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Project sub-scores, each on the 0–5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectScores {
    pub correctness: f64,
    pub code_quality: f64,
    pub resilience: f64,
    pub documentation: f64,
    pub creativity: f64,
}

/// Weights combining [`ProjectScores`]. Sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectWeights {
    pub correctness: f64,
    pub code_quality: f64,
    pub resilience: f64,
    pub documentation: f64,
    pub creativity: f64,
}

impl ProjectWeights {
    pub const STANDARD: ProjectWeights = ProjectWeights {
        correctness: 0.30,
        code_quality: 0.25,
        resilience: 0.20,
        documentation: 0.15,
        creativity: 0.10,
    };

    pub fn total(&self) -> f64 {
        self.correctness + self.code_quality + self.resilience + self.documentation + self.creativity
    }
}

impl Default for ProjectWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Sub-scores plus the weights that produced the composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvBreakdown {
    pub scores: CvScores,
    pub weights: CvWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectBreakdown {
    pub scores: ProjectScores,
    pub weights: ProjectWeights,
}

/// Final output of the evaluation pipeline. Built once by the orchestrator,
/// persisted with its job, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// 0–1, weighted CV mean divided by 5.
    pub cv_match_rate: f64,
    pub cv_feedback: String,
    /// 0–5, weighted project sum.
    pub project_score: f64,
    pub project_feedback: String,
    pub overall_summary: String,
    pub cv_breakdown: CvBreakdown,
    pub project_breakdown: ProjectBreakdown,
}
