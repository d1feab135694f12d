//! TOML configuration parsing and validation.
//!
//! Every section carries defaults, so an empty file (or
//! [`Config::default`]) yields a working setup that queries all four
//! public sources, keeps an in-memory context store, and generates with
//! Gemini when `GEMINI_API_KEY` is present.
//!
//! ```toml
//! [retrieval]
//! query_variants = 3
//! final_limit = 5
//! relevance_limit = 3
//!
//! [store]
//! backend = "memory"
//!
//! [generation]
//! provider = "gemini"
//! model = "gemini-2.0-flash"
//!
//! [adapters.wikipedia]
//! search_delay_ms = 1000
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::SourceTag;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// How many of the seven topic expansions are sent to the router.
    #[serde(default = "default_query_variants")]
    pub query_variants: usize,
    /// Size of the vector-search and raw-document tiers.
    #[serde(default = "default_final_limit")]
    pub final_limit: usize,
    /// Maximum documents kept after the keyword relevance filter.
    #[serde(default = "default_relevance_limit")]
    pub relevance_limit: usize,
    /// Upper bound on the whole concurrent fan-out, per adapter.
    #[serde(default = "default_fanout_timeout_secs")]
    pub fanout_timeout_secs: u64,
    /// Sources admitted regardless of keyword overlap with the topic.
    #[serde(default = "default_prioritized_sources")]
    pub prioritized_sources: Vec<SourceTag>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            query_variants: default_query_variants(),
            final_limit: default_final_limit(),
            relevance_limit: default_relevance_limit(),
            fanout_timeout_secs: default_fanout_timeout_secs(),
            prioritized_sources: default_prioritized_sources(),
        }
    }
}

fn default_query_variants() -> usize {
    3
}
fn default_final_limit() -> usize {
    5
}
fn default_relevance_limit() -> usize {
    3
}
fn default_fanout_timeout_secs() -> u64 {
    30
}
fn default_prioritized_sources() -> Vec<SourceTag> {
    vec![SourceTag::AcademicIndex, SourceTag::GovernmentIndex]
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dims: default_dims(),
        }
    }
}

impl StoreConfig {
    pub fn is_enabled(&self) -> bool {
        self.backend != "disabled"
    }
}

fn default_backend() -> String {
    "memory".to_string()
}
fn default_dims() -> usize {
    384
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_question_temperature")]
    pub question_temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_generation_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            question_temperature: default_question_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_question_temperature() -> f32 {
    0.4
}
fn default_top_p() -> f32 {
    0.9
}
fn default_top_k() -> u32 {
    50
}
fn default_max_output_tokens() -> u32 {
    2048
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_base_ms() -> u64 {
    1000
}
fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct PromptConfig {
    /// Context snippets embedded in the generation request.
    #[serde(default = "default_context_snippets")]
    pub context_snippets: usize,
    /// Characters kept from each snippet.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            context_snippets: default_context_snippets(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_context_snippets() -> usize {
    2
}
fn default_snippet_chars() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdaptersConfig {
    #[serde(default)]
    pub openalex: AdapterConfig,
    #[serde(default)]
    pub wikipedia: AdapterConfig,
    #[serde(default)]
    pub gdelt: AdapterConfig,
    #[serde(default)]
    pub govuk: AdapterConfig,
}

/// Per-adapter overrides. Unset fields fall back to the adapter's own
/// defaults (see each adapter module's `DEFAULT_*` constants).
#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Encyclopedia only: page-summary endpoint.
    #[serde(default)]
    pub summary_url: Option<String>,
    /// Encyclopedia only: pause before the search request.
    #[serde(default)]
    pub search_delay_ms: Option<u64>,
    /// Encyclopedia only: pause before each page-summary request.
    #[serde(default)]
    pub page_delay_ms: Option<u64>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            timeout_secs: None,
            limit: None,
            summary_url: None,
            search_delay_ms: None,
            page_delay_ms: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Check cross-field constraints that serde cannot express.
pub fn validate(config: &Config) -> Result<()> {
    // Retrieval
    if config.retrieval.final_limit < 1 {
        anyhow::bail!("retrieval.final_limit must be >= 1");
    }
    if config.retrieval.relevance_limit < 1 {
        anyhow::bail!("retrieval.relevance_limit must be >= 1");
    }
    if !(1..=7).contains(&config.retrieval.query_variants) {
        anyhow::bail!("retrieval.query_variants must be in [1, 7]");
    }
    if config.retrieval.fanout_timeout_secs == 0 {
        anyhow::bail!("retrieval.fanout_timeout_secs must be > 0");
    }

    // Store
    match config.store.backend.as_str() {
        "memory" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown store backend: '{}'. Must be memory or disabled.",
            other
        ),
    }
    if config.store.is_enabled() && config.store.dims < 32 {
        anyhow::bail!("store.dims must be >= 32 when the store is enabled");
    }

    // Generation
    match config.generation.provider.as_str() {
        "disabled" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or gemini.",
            other
        ),
    }
    if config.generation.timeout_secs == 0 {
        anyhow::bail!("generation.timeout_secs must be > 0");
    }

    // Adapters
    for (name, adapter) in [
        ("openalex", &config.adapters.openalex),
        ("wikipedia", &config.adapters.wikipedia),
        ("gdelt", &config.adapters.gdelt),
        ("govuk", &config.adapters.govuk),
    ] {
        if adapter.timeout_secs == Some(0) {
            anyhow::bail!("adapters.{}.timeout_secs must be > 0", name);
        }
        if adapter.limit == Some(0) {
            anyhow::bail!("adapters.{}.limit must be >= 1", name);
        }
    }

    Ok(())
}
