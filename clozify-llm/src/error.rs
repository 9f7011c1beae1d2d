//! Error types for generation

use async_openai::error::OpenAIError;
use clozify_core::{is_rate_limit, ClozifyError, Retryable};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenAI API error: {0}")]
    OpenAI(OpenAIError),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("No completion returned from API")]
    EmptyResponse,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Table(#[from] ClozifyError),
}

impl LlmError {
    pub fn config(msg: impl Into<String>) -> Self {
        LlmError::Config(msg.into())
    }

    /// Classify a non-success HTTP response
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 {
            LlmError::RateLimited(body)
        } else {
            LlmError::Api { status, body }
        }
    }
}

impl From<OpenAIError> for LlmError {
    fn from(e: OpenAIError) -> Self {
        let limited = match &e {
            OpenAIError::ApiError(api) => is_rate_limit(api.code.as_deref(), &api.message),
            other => is_rate_limit(None, &other.to_string()),
        };
        if limited {
            LlmError::RateLimited(e.to_string())
        } else {
            LlmError::OpenAI(e)
        }
    }
}

impl Retryable for LlmError {
    fn is_transient(&self) -> bool {
        match self {
            LlmError::RateLimited(_) => true,
            LlmError::Api { status, .. } => *status >= 500,
            LlmError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            LlmError::from_status(429, "slow down".into()),
            LlmError::RateLimited(_)
        ));
        assert!(LlmError::from_status(429, String::new()).is_transient());
        assert!(LlmError::from_status(503, String::new()).is_transient());
        assert!(!LlmError::from_status(400, String::new()).is_transient());
        assert!(!LlmError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_openai_error_classification() {
        let limited = OpenAIError::InvalidArgument("rate limit reached".into());
        assert!(LlmError::from(limited).is_transient());

        let unrelated = OpenAIError::InvalidArgument("max_tokens 4290 too large".into());
        assert!(matches!(LlmError::from(unrelated), LlmError::OpenAI(_)));
    }

    #[test]
    fn test_error_display() {
        let err = LlmError::Api {
            status: 401,
            body: "invalid key".into(),
        };
        assert_eq!(err.to_string(), "API error (401): invalid key");
    }
}
