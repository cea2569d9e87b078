// Stage prompt templates for the evaluation pipeline.
// The JSON-only instruction is appended by the LLM client, not here.

/// Extract stage. Replace `{cv_content}`.
pub const EXTRACT_CV_TEMPLATE: &str = r#"You are an expert technical recruiter. Extract a structured profile from the CV below.

Return a JSON object with this EXACT schema:
{
  "technical_skills": ["Rust", "PostgreSQL"],
  "experience_years": 4,
  "projects": [
    {"name": "...", "description": "...", "technologies": ["..."], "impact": "..."}
  ],
  "achievements": ["..."],
  "education": "...",
  "certifications": ["..."]
}

Only include facts stated in the CV. Use empty arrays for missing sections.

CV:
{cv_content}"#;

/// Score-CV stage. Replace `{cv_profile}` and `{context}`.
pub const SCORE_CV_TEMPLATE: &str = r#"You are evaluating a candidate for a backend engineering role.

{context}
Candidate profile (JSON):
{cv_profile}

Score the candidate against the job descriptions above. Every score is a number from 0 to 5:
- technical_skills_score: backend, databases, APIs, cloud, AI/LLM exposure
- experience_level_score: years of experience and complexity of past work
- achievements_score: measurable impact and scale of results
- cultural_fit_score: communication, ownership, learning attitude

Return a JSON object with this EXACT schema:
{
  "technical_skills_score": 4,
  "experience_level_score": 3,
  "achievements_score": 3,
  "cultural_fit_score": 4,
  "feedback": "Two or three sentences on strengths and gaps."
}"#;

/// Score-project stage. Replace `{project_content}` and `{context}`.
pub const SCORE_PROJECT_TEMPLATE: &str = r#"You are reviewing a take-home project report for a backend engineering role.

{context}
Project report:
{project_content}

Score the project. Every score is a number from 0 to 5:
- correctness_score: meets requirements (prompt design, LLM chaining, retrieval)
- code_quality_score: structure, modularity, tests
- resilience_score: error handling, retries, long-running job handling
- documentation_score: README clarity, setup steps, trade-off explanations
- creativity_score: useful extras beyond the requirements

Return a JSON object with this EXACT schema:
{
  "correctness_score": 4,
  "code_quality_score": 4,
  "resilience_score": 3,
  "documentation_score": 4,
  "creativity_score": 2,
  "feedback": "Two or three sentences on strengths and gaps."
}"#;

/// Summarize stage. Replace `{cv_evaluation}` and `{project_evaluation}`.
pub const SUMMARY_TEMPLATE: &str = r#"Write a short hiring summary (3 to 5 sentences) for the candidate below.
Cover the overall assessment, key strengths, main gaps and a clear recommendation.
Plain text only.

CV evaluation:
{cv_evaluation}

Project evaluation:
{project_evaluation}"#;

/// Fills `{name}` placeholders in one left-to-right pass. Substituted text is
/// never rescanned, so braces inside documents stay literal. Unknown
/// `{...}` spans (the JSON shapes in the templates) are copied through.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
