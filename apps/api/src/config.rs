use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::evaluation::retry::RetryPolicy;
use crate::llm_client::LlmSettings;
use crate::worker::WorkerConfig;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OPENAI_MODEL: &str = "gpt-4";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const OPENROUTER_MODEL: &str = "openai/gpt-4";
const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmSettings,
    /// Job retry budget, also the attempt budget of every LLM call.
    pub max_retries: u32,
    pub llm_backoff_unit: Duration,
    pub queue_error_backoff: Duration,
    pub retrieval_top_k: usize,
    pub queue_name: String,
    pub upload_dir: String,
    pub max_file_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            redis_url: require("REDIS_URL")?,
            port: parse_or(&get, "PORT", 8080)?,
            rust_log: or("RUST_LOG", "info"),
            llm: resolve_llm(&get)?,
            max_retries: parse_or(&get, "MAX_RETRIES", 3)?,
            llm_backoff_unit: Duration::from_millis(parse_or(&get, "LLM_BACKOFF_UNIT_MS", 1000)?),
            queue_error_backoff: Duration::from_secs(parse_or(
                &get,
                "QUEUE_ERROR_BACKOFF_SECS",
                5,
            )?),
            retrieval_top_k: parse_or(&get, "RETRIEVAL_TOP_K", 2)?,
            queue_name: or("QUEUE_NAME", "evaluation_queue"),
            upload_dir: or("UPLOAD_DIR", "./uploads"),
            max_file_size: parse_or(&get, "MAX_FILE_SIZE", 10 * 1024 * 1024)?,
        })
    }

    pub fn llm_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.llm_backoff_unit)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            max_retries: self.max_retries,
            queue_error_backoff: self.queue_error_backoff,
        }
    }

    /// Minimal config with millisecond backoff, for handler tests.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::from_lookup(|key| {
            let value = match key {
                "DATABASE_URL" => "postgres://localhost/evaluator_test",
                "REDIS_URL" => "redis://localhost:6379",
                "OPENAI_API_KEY" => "sk-test",
                "LLM_BACKOFF_UNIT_MS" => "1",
                _ => return None,
            };
            Some(value.to_string())
        })
        .unwrap()
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

/// OpenAI when `OPENAI_API_KEY` is set, otherwise OpenRouter.
fn resolve_llm(get: &impl Fn(&str) -> Option<String>) -> Result<LlmSettings> {
    let embedding_model = get("EMBEDDING_MODEL").unwrap_or_else(|| EMBEDDING_MODEL.to_string());
    let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(api_key) = non_empty("OPENAI_API_KEY") {
        return Ok(LlmSettings {
            api_key,
            base_url: non_empty("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: non_empty("OPENAI_MODEL").unwrap_or_else(|| OPENAI_MODEL.to_string()),
            embedding_model,
        });
    }

    let api_key = non_empty("OPENROUTER_API_KEY")
        .context("Either OPENAI_API_KEY or OPENROUTER_API_KEY must be set")?;
    Ok(LlmSettings {
        api_key,
        base_url: non_empty("OPENROUTER_BASE_URL")
            .unwrap_or_else(|| OPENROUTER_BASE_URL.to_string()),
        model: non_empty("OPENROUTER_MODEL").unwrap_or_else(|| OPENROUTER_MODEL.to_string()),
        embedding_model,
    })
}
