/// LLM Client: the single point of entry for every model call in the evaluator.
///
/// ARCHITECTURAL RULE: no other module talks to the model provider directly.
/// Pipeline code depends on the [`LlmService`] trait; the HTTP implementation
/// here speaks the OpenAI-compatible `/chat/completions` and `/embeddings` API
/// (OpenAI or OpenRouter, picked by config).
///
/// Calls are single-shot. Retrying is the caller's job (see
/// `evaluation::retry`), which uses [`LlmError::is_transient`] to decide.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[cfg(test)]
pub mod mock;
pub mod prompts;

/// Output budget for both completion kinds.
pub const MAX_TOKENS: u32 = 2000;
/// Embedding input is cut to this many characters before sending.
pub const EMBEDDING_MAX_CHARS: usize = 8000;
const EMBEDDING_MIN_CHARS: usize = 3;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited")]
    RateLimited,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Network failures, 429 and 5xx are worth another attempt; anything else
    /// will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::RateLimited => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::InvalidInput(_) | LlmError::EmptyContent => false,
        }
    }
}

/// The three model operations the pipeline consumes.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, LlmError>;

    async fn generate_completion(&self, prompt: &str, temperature: f32)
        -> Result<String, LlmError>;

    /// Same as [`LlmService::generate_completion`] but instructs the model to
    /// answer with a bare JSON object. The raw text is returned; decoding is
    /// the caller's concern.
    async fn generate_structured_completion(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP client
// ────────────────────────────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    settings: LlmSettings,
}

impl LlmClient {
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, LlmError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<R>().await?)
    }

    async fn chat(&self, content: &str, temperature: f32) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            temperature,
            max_tokens: MAX_TOKENS,
        };

        let response: ChatResponse = self.post("chat/completions", &request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens,
                usage.completion_tokens.unwrap_or_default()
            );
        }

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl LlmService for LlmClient {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let input = prepare_embedding_input(text)?;
        let request = EmbeddingRequest {
            model: &self.settings.embedding_model,
            input: [input],
        };

        let response: EmbeddingResponse = self.post("embeddings", &request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn generate_completion(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        self.chat(prompt, temperature).await
    }

    async fn generate_structured_completion(
        &self,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let prompt = format!("{prompt}\n\n{}", prompts::JSON_ONLY_SUFFIX);
        self.chat(&prompt, temperature).await
    }
}

/// Applies the embedding input rules: reject empty input, cut to
/// [`EMBEDDING_MAX_CHARS`] characters, trim, then reject anything shorter than
/// three characters or carrying NUL bytes.
pub fn prepare_embedding_input(text: &str) -> Result<&str, LlmError> {
    if text.is_empty() {
        return Err(LlmError::InvalidInput("input text cannot be empty".into()));
    }

    let truncated = match text.char_indices().nth(EMBEDDING_MAX_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    };
    let trimmed = truncated.trim();

    if trimmed.chars().count() < EMBEDDING_MIN_CHARS {
        return Err(LlmError::InvalidInput("input text is too short".into()));
    }
    if trimmed.contains('\0') {
        return Err(LlmError::InvalidInput(
            "input text contains null bytes".into(),
        ));
    }
    Ok(trimmed)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_embedding_input_rejects_empty_and_short() {
        assert!(matches!(
            prepare_embedding_input(""),
            Err(LlmError::InvalidInput(_))
        ));
        assert!(matches!(
            prepare_embedding_input("   ab   "),
            Err(LlmError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_embedding_input_rejects_null_bytes() {
        assert!(prepare_embedding_input("abc\0def").is_err());
    }

    #[test]
    fn test_embedding_input_truncates_on_char_boundary() {
        let long = "é".repeat(EMBEDDING_MAX_CHARS + 50);
        let prepared = prepare_embedding_input(&long).unwrap();
        assert_eq!(prepared.chars().count(), EMBEDDING_MAX_CHARS);
    }

    #[test]
    fn test_embedding_input_is_trimmed() {
        assert_eq!(prepare_embedding_input("  rust  ").unwrap(), "rust");
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::RateLimited.is_transient());
        assert!(LlmError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(!LlmError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!LlmError::EmptyContent.is_transient());
        assert!(!LlmError::InvalidInput("x".into()).is_transient());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let client = LlmClient::new(LlmSettings {
            api_key: "k".into(),
            base_url: "https://api.openai.com/v1/".into(),
            model: "gpt-4".into(),
            embedding_model: "text-embedding-ada-002".into(),
        })
        .unwrap();
        assert_eq!(
            client.endpoint("embeddings"),
            "https://api.openai.com/v1/embeddings"
        );
    }

    #[test]
    fn test_chat_request_serializes_budget() {
        let request = ChatRequest {
            model: "gpt-4",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.3,
            max_tokens: MAX_TOKENS,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
