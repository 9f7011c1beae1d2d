//! Embeddings for the clozify pipeline
//!
//! This crate turns a text column of a vocabulary or cloze table into an
//! embedding column, using OpenAI's embedding models.
//!
//! ## Features
//! - [`EmbeddingProvider`] seam with an OpenAI implementation
//! - Per-row retry with randomized exponential backoff
//! - Request spacing to stay under provider rate limits
//! - SQLite cache so re-running an import does not re-embed known text
//! - Partial-failure attachment: one bad row never aborts the batch

pub mod attach;
pub mod cache;
pub mod client;
pub mod error;
pub mod provider;
pub mod rate_limiter;

pub use attach::{AttachOutcome, EmbeddingAttacher, RowFailure};
pub use cache::{CacheStats, EmbeddingCache};
pub use client::{known_dimension, EmbeddingClient, EmbeddingConfig, DEFAULT_EMBEDDING_MODEL};
pub use error::{EmbeddingError, Result};
pub use provider::EmbeddingProvider;
pub use rate_limiter::{RateLimiter, RateLimiterStats};
