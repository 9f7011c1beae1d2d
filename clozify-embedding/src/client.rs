//! OpenAI embedding client

use async_openai::{
    config::OpenAIConfig,
    types::embeddings::{CreateEmbeddingRequest, EmbeddingInput},
    Client,
};
use async_trait::async_trait;
use clozify_core::EmbeddingVector;
use tracing::{debug, instrument};

use crate::{
    error::{EmbeddingError, Result},
    provider::EmbeddingProvider,
};

/// Embedding model used when none is configured
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Settings for [`EmbeddingClient`]
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// API key; `None` lets the OpenAI client read `OPENAI_API_KEY`
    pub api_key: Option<String>,
    pub model: String,
    /// Expected vector length, checked on every response when set
    pub dimension: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::for_model(DEFAULT_EMBEDDING_MODEL)
    }
}

impl EmbeddingConfig {
    /// Config for `model`, checking the vector length only for known models
    pub fn for_model(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            api_key: None,
            dimension: known_dimension(&model),
            model,
        }
    }
}

/// Native vector length of OpenAI embedding models
pub fn known_dimension(model: &str) -> Option<usize> {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => Some(1536),
        "text-embedding-3-large" => Some(3072),
        _ => None,
    }
}

/// OpenAI embedding client
pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: Option<usize>,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(config: EmbeddingConfig) -> Self {
        let mut openai = OpenAIConfig::new();
        if let Some(api_key) = config.api_key {
            openai = openai.with_api_key(api_key);
        }
        Self {
            client: Client::with_config(openai),
            model: config.model,
            dimension: config.dimension,
        }
    }

    /// Low-level embedding generation
    async fn generate_embedding(&self, text: &str) -> Result<EmbeddingVector> {
        let request = CreateEmbeddingRequest {
            model: self.model.clone(),
            input: EmbeddingInput::String(text.to_string()),
            encoding_format: None,
            dimensions: None,
            user: None,
        };

        let response = self.client.embeddings().create(request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or(EmbeddingError::EmptyResponse)?;

        if let Some(expected) = self.dimension {
            if embedding.len() != expected {
                return Err(EmbeddingError::InvalidDimension {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        debug!(
            "Generated embedding: dimension={}, model={}, tokens={}",
            embedding.len(),
            self.model,
            response.usage.total_tokens
        );

        Ok(embedding)
    }

    /// Get the embedding dimension, if one is enforced
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    #[instrument(skip(self))]
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.generate_embedding(text).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
