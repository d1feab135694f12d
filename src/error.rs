//! Error kinds raised at the pipeline's seams.
//!
//! Only [`PipelineError`] crosses the pipeline boundary. Source errors
//! always become degraded substitutes. Generation errors do too, except
//! when answering a question, which has no canned answer.

use thiserror::Error;

/// Why a source adapter could not produce real documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Network failure, timeout, or non-success HTTP status.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered 403 Forbidden.
    #[error("source blocked (403)")]
    Blocked,

    /// The payload could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The call succeeded but yielded no usable documents.
    #[error("no usable documents returned")]
    Empty,
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Malformed(e.to_string())
        } else {
            SourceError::Unavailable(e.to_string())
        }
    }
}

/// Failure of the external text-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Rate limit or quota exhaustion; retryable.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Non-retryable API error.
    #[error("generation API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response had no candidate text.
    #[error("malformed generation response: {0}")]
    Malformed(String),

    /// No provider is configured.
    #[error("generation provider is disabled")]
    Disabled,
}

impl GenerationError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }
}

/// Errors surfaced to callers of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("topic must not be empty")]
    EmptyTopic,

    /// Only question answering reports this; stimulus generation falls
    /// back instead.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
