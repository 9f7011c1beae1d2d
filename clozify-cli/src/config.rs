//! Runtime configuration read from the environment

use std::path::PathBuf;

use clozify_core::{ClozifyError, Result};
use clozify_embedding::{rate_limiter::DEFAULT_MIN_REQUEST_INTERVAL_MS, DEFAULT_EMBEDDING_MODEL};
use clozify_llm::DEFAULT_CHAT_MODEL;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const EMBEDDING_MODEL_VAR: &str = "CLOZIFY_EMBEDDING_MODEL";
pub const EMBEDDING_DIMENSION_VAR: &str = "CLOZIFY_EMBEDDING_DIMENSION";
pub const CHAT_MODEL_VAR: &str = "CLOZIFY_CHAT_MODEL";
pub const CACHE_PATH_VAR: &str = "CLOZIFY_CACHE_PATH";
pub const REQUEST_INTERVAL_VAR: &str = "CLOZIFY_REQUEST_INTERVAL_MS";

#[derive(Debug, Clone, PartialEq)]
pub struct ClozifyConfig {
    /// `None` leaves key discovery to the OpenAI clients
    pub api_key: Option<String>,
    pub embedding_model: String,
    /// Expected embedding length; known models supply their own when unset
    pub embedding_dimension: Option<usize>,
    pub chat_model: String,
    /// SQLite embedding cache; disabled when unset
    pub cache_path: Option<PathBuf>,
    pub request_interval_ms: u64,
}

impl Default for ClozifyConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: None,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            cache_path: None,
            request_interval_ms: DEFAULT_MIN_REQUEST_INTERVAL_MS,
        }
    }
}

impl ClozifyConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let request_interval_ms = match get(REQUEST_INTERVAL_VAR) {
            Some(value) => value.trim().parse().map_err(|_| {
                ClozifyError::config(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    REQUEST_INTERVAL_VAR, value
                ))
            })?,
            None => defaults.request_interval_ms,
        };

        let embedding_dimension = get(EMBEDDING_DIMENSION_VAR)
            .map(|value| {
                value.trim().parse().map_err(|_| {
                    ClozifyError::config(format!(
                        "{} must be a positive integer, got '{}'",
                        EMBEDDING_DIMENSION_VAR, value
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            api_key: get(API_KEY_VAR),
            embedding_model: get(EMBEDDING_MODEL_VAR).unwrap_or(defaults.embedding_model),
            embedding_dimension,
            chat_model: get(CHAT_MODEL_VAR).unwrap_or(defaults.chat_model),
            cache_path: get(CACHE_PATH_VAR).map(PathBuf::from),
            request_interval_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClozifyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClozifyConfig::default());
        assert_eq!(config.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.request_interval_ms, 1000);
    }

    #[test]
    fn test_overrides() {
        let config = ClozifyConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CLOZIFY_CHAT_MODEL", "gpt-4o-mini"),
            ("CLOZIFY_CACHE_PATH", "data/embeddings.db"),
            ("CLOZIFY_REQUEST_INTERVAL_MS", "250"),
            ("CLOZIFY_EMBEDDING_MODEL", ""),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.chat_model, "gpt-4o-mini");
        assert_eq!(config.embedding_model, "text-embedding-ada-002");
        assert_eq!(config.cache_path, Some(PathBuf::from("data/embeddings.db")));
        assert_eq!(config.request_interval_ms, 250);
    }

    #[test]
    fn test_embedding_dimension() {
        let config = ClozifyConfig::from_lookup(lookup(&[
            ("CLOZIFY_EMBEDDING_MODEL", "text-embedding-3-large"),
            ("CLOZIFY_EMBEDDING_DIMENSION", "256"),
        ]))
        .unwrap();
        assert_eq!(config.embedding_dimension, Some(256));

        let err = ClozifyConfig::from_lookup(lookup(&[("CLOZIFY_EMBEDDING_DIMENSION", "wide")]))
            .unwrap_err();
        assert!(matches!(err, ClozifyError::Config(_)));
    }

    #[test]
    fn test_bad_interval() {
        let err = ClozifyConfig::from_lookup(lookup(&[("CLOZIFY_REQUEST_INTERVAL_MS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ClozifyError::Config(_)));
    }
}
