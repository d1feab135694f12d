//! Text-generation service abstraction and implementations.
//!
//! Defines the [`Generator`] trait and:
//! - **[`DisabledGenerator`]**: always fails; used when no provider is configured.
//! - **[`GeminiGenerator`]**: one `generateContent` call against the Gemini REST API.
//! - **[`RetryingGenerator`]**: wraps any generator with the retry policy below.
//!
//! # Retry Strategy
//!
//! Only rate limiting is retried:
//! - [`GenerationError::RateLimited`] → retry up to `max_retries` more times,
//!   waiting `retry_base_ms × 2^attempt` plus uniform jitter in `[0, retry_base_ms)`
//! - anything else → surface immediately
//!
//! A response is classified as rate-limited on HTTP 429, or when an error
//! body mentions "rate limit", "quota", or "too many requests".

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::error::GenerationError;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.0-flash"`).
    fn model_name(&self) -> &str;

    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

// ============ Disabled Generator ============

/// A generator that always returns [`GenerationError::Disabled`].
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

// ============ Gemini Generator ============

/// Generator backed by the Gemini `generateContent` endpoint.
///
/// The API key is read once, at construction, from the environment
/// variable named by `generation.api_key_env`.
pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

impl GeminiGenerator {
    /// # Errors
    ///
    /// Returns an error if the API key variable is unset or empty.
    pub fn new(config: &GenerationConfig, temperature: f32) -> Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(k) if !k.trim().is_empty() => k,
            _ => bail!("{} environment variable not set", config.api_key_env),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            model: config.model.clone(),
            api_key,
            temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "topP": self.top_p,
                "topK": self.top_k,
                "maxOutputTokens": self.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &text));
        }

        parse_generate_response(&text)
    }
}

/// Map a non-success HTTP response onto an error kind.
pub fn classify_failure(status: u16, body: &str) -> GenerationError {
    let lower = body.to_lowercase();
    let rate_limited = status == 429
        || ["rate limit", "quota", "too many requests"]
            .iter()
            .any(|term| lower.contains(term));

    if rate_limited {
        GenerationError::RateLimited(format!("HTTP {}", status))
    } else {
        GenerationError::Api {
            status,
            message: body.chars().take(300).collect(),
        }
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::Malformed("no candidate text".to_string()));
    }
    Ok(text)
}

// ============ Retry Policy ============

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_ms),
        }
    }

    /// Wait before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        exp + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let sample = (Uuid::new_v4().as_u128() % base_ms as u128) as u64;
        Duration::from_millis(sample)
    }
}

/// Retries rate-limited failures of the wrapped generator.
pub struct RetryingGenerator<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: Generator> RetryingGenerator<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<G: Generator> Generator for RetryingGenerator<G> {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limited() && attempt < self.policy.max_retries => {
                    let wait = self.policy.backoff(attempt);
                    warn!(
                        model = self.inner.model_name(),
                        attempt = attempt + 1,
                        wait_ms = wait.as_millis() as u64,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Create the [`Generator`] selected by `config.provider`.
///
/// | Config Value | Generator |
/// |-------------|-----------|
/// | `"disabled"` | [`DisabledGenerator`] |
/// | `"gemini"` | [`GeminiGenerator`] wrapped in [`RetryingGenerator`] |
pub fn create_generator(config: &GenerationConfig, temperature: f32) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGenerator)),
        "gemini" => Ok(Box::new(RetryingGenerator::new(
            GeminiGenerator::new(config, temperature)?,
            RetryPolicy::from_config(config),
        ))),
        other => bail!("Unknown generation provider: {}", other),
    }
}
