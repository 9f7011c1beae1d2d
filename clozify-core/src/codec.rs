//! Textual encoding of embedding vectors
//!
//! Flat files store an embedding as a bracketed list literal such as
//! `[0.1, -0.25, 3e-05]`. Only this module knows that format.

use crate::error::{ClozifyError, Result};
use crate::types::EmbeddingVector;

/// Encode a vector as a bracketed list literal
pub fn encode_embedding(embedding: &[f32]) -> String {
    let items: Vec<String> = embedding.iter().map(|x| x.to_string()).collect();
    format!("[{}]", items.join(", "))
}

/// Decode a bracketed list literal back into a vector
pub fn decode_embedding(literal: &str) -> Result<EmbeddingVector> {
    let trimmed = literal.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return Err(ClozifyError::parse(format!(
            "embedding literal must be a bracketed list, got '{}'",
            abbreviate(trimmed)
        )));
    }
    serde_json::from_str(trimmed).map_err(|e| {
        ClozifyError::parse(format!(
            "invalid embedding literal '{}': {}",
            abbreviate(trimmed),
            e
        ))
    })
}

fn abbreviate(s: &str) -> String {
    const LIMIT: usize = 40;
    if s.chars().count() <= LIMIT {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(LIMIT).collect::<String>())
    }
}
