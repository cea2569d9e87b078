//! Scripted in-process `LlmService` for tests.
//!
//! Embeddings are a deterministic letter-frequency vector, so texts that share
//! vocabulary land close together. Completions replay queued replies in order
//! and fall back to a default once the script runs dry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmError, LlmService};

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Maps to `LlmError::RateLimited`.
    Transient,
    /// Maps to a 400 `LlmError::Api`.
    Permanent,
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Reply::Text(s.into())
    }

    fn into_result(self) -> Result<String, LlmError> {
        match self {
            Reply::Text(s) => Ok(s),
            Reply::Transient => Err(LlmError::RateLimited),
            Reply::Permanent => Err(LlmError::Api {
                status: 400,
                message: "scripted failure".into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmbeddingMode {
    LetterFrequency,
    AlwaysTransient,
    AlwaysPermanent,
}

pub struct MockLlm {
    embedding_mode: Mutex<EmbeddingMode>,
    structured: Mutex<VecDeque<Reply>>,
    completions: Mutex<VecDeque<Reply>>,
    default_structured: Reply,
    default_completion: Reply,
    pub embed_calls: AtomicUsize,
    pub structured_calls: AtomicUsize,
    pub completion_calls: AtomicUsize,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self {
            embedding_mode: Mutex::new(EmbeddingMode::LetterFrequency),
            structured: Mutex::new(VecDeque::new()),
            completions: Mutex::new(VecDeque::new()),
            default_structured: Reply::text(r#"{"error": "no scripted reply"}"#),
            default_completion: Reply::text("Solid candidate overall."),
            embed_calls: AtomicUsize::new(0),
            structured_calls: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
        }
    }
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding_mode(self, mode: EmbeddingMode) -> Self {
        *self.embedding_mode.lock().unwrap() = mode;
        self
    }

    pub fn push_structured(&self, reply: Reply) -> &Self {
        self.structured.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_completion(&self, reply: Reply) -> &Self {
        self.completions.lock().unwrap().push_back(reply);
        self
    }

    /// Queues the three structured replies of one successful evaluation.
    pub fn script_successful_run(&self) -> &Self {
        self.push_structured(Reply::text(CV_PROFILE_JSON))
            .push_structured(Reply::text(CV_SCORES_JSON))
            .push_structured(Reply::text(PROJECT_SCORES_JSON))
            .push_completion(Reply::text(SUMMARY_TEXT))
    }

    pub fn total_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
            + self.structured_calls.load(Ordering::SeqCst)
            + self.completion_calls.load(Ordering::SeqCst)
    }
}

pub const CV_PROFILE_JSON: &str = r#"{
    "technical_skills": ["Rust", "PostgreSQL", "Redis"],
    "experience_years": 5,
    "projects": [
        {"name": "billing", "description": "payments backend", "technologies": ["Rust"], "impact": "cut latency 40%"}
    ],
    "achievements": ["Led migration to async runtime"],
    "education": "BSc Computer Science",
    "certifications": []
}"#;

pub const CV_SCORES_JSON: &str = r#"```json
{
    "technical_skills_score": 4,
    "experience_level_score": 4,
    "achievements_score": 3,
    "cultural_fit_score": 5,
    "feedback": "Strong backend fundamentals, limited LLM exposure."
}
```"#;

pub const PROJECT_SCORES_JSON: &str = r#"{
    "correctness_score": 4,
    "code_quality_score": 4,
    "resilience_score": 3,
    "documentation_score": 5,
    "creativity_score": 2,
    "feedback": "Clean pipeline, retries could be smarter."
}"#;

pub const SUMMARY_TEXT: &str =
    "The candidate is a solid backend engineer. Strengths: Rust and storage. \
     Gaps: LLM tooling. Recommendation: proceed to interview.";

fn letter_frequency(text: &str) -> Vec<f32> {
    let mut v = vec![0.0_f32; 26];
    for c in text.chars().filter(|c| c.is_ascii_alphabetic()) {
        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    v
}

#[async_trait]
impl LlmService for MockLlm {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.embedding_mode.lock().unwrap();
        match mode {
            EmbeddingMode::LetterFrequency => Ok(letter_frequency(text)),
            EmbeddingMode::AlwaysTransient => Err(LlmError::RateLimited),
            EmbeddingMode::AlwaysPermanent => Err(LlmError::Api {
                status: 401,
                message: "invalid api key".into(),
            }),
        }
    }

    async fn generate_completion(
        &self,
        _prompt: &str,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.completions.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.default_completion.clone())
            .into_result()
    }

    async fn generate_structured_completion(
        &self,
        _prompt: &str,
        _temperature: f32,
    ) -> Result<String, LlmError> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.structured.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.default_structured.clone())
            .into_result()
    }
}
