//! Embedding provider seam

use async_trait::async_trait;
use clozify_core::EmbeddingVector;

use crate::error::Result;

/// Converts text into a fixed-length vector
///
/// Implementations make one remote call per invocation and report rate
/// limiting as [`EmbeddingError::RateLimited`](crate::EmbeddingError::RateLimited)
/// so callers can retry.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;

    /// Model identifier, part of the cache key
    fn model(&self) -> &str;
}
