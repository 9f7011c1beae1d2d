//! Error types for embedding operations

use async_openai::error::OpenAIError;
use clozify_core::{is_rate_limit, ClozifyError, Retryable};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("OpenAI API error: {0}")]
    OpenAI(OpenAIError),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("No embeddings returned from API")]
    EmptyResponse,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Table(#[from] ClozifyError),
}

impl From<OpenAIError> for EmbeddingError {
    fn from(e: OpenAIError) -> Self {
        if reports_rate_limit(&e) {
            EmbeddingError::RateLimited(e.to_string())
        } else {
            EmbeddingError::OpenAI(e)
        }
    }
}

/// OpenAI tags 429s with the `rate_limit_exceeded` error code
pub(crate) fn reports_rate_limit(e: &OpenAIError) -> bool {
    match e {
        OpenAIError::ApiError(api) => is_rate_limit(api.code.as_deref(), &api.message),
        other => is_rate_limit(None, &other.to_string()),
    }
}

impl From<rusqlite::Error> for EmbeddingError {
    fn from(e: rusqlite::Error) -> Self {
        EmbeddingError::Database(e.to_string())
    }
}

impl Retryable for EmbeddingError {
    fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::RateLimited(_))
    }
}
