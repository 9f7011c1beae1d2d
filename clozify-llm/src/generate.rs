//! Cloze generator seam

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

/// Produces a `text,translation,cloze` line for a vocabulary word
#[async_trait]
pub trait ClozeGenerator: Send + Sync {
    /// Generate one cloze line; generators may ignore the definition
    async fn generate(&self, word: &str, definition: &str) -> Result<String>;

    /// Model identifier
    fn model(&self) -> &str;
}

/// Generate a cloze line for each `(word, definition)` pair, in order
pub async fn generate_batch<G>(generator: &G, inputs: &[(String, String)]) -> Result<Vec<String>>
where
    G: ClozeGenerator + ?Sized,
{
    let mut lines = Vec::with_capacity(inputs.len());
    for (word, definition) in inputs {
        lines.push(generator.generate(word, definition).await?);
    }
    info!("Generated {} clozes with {}", lines.len(), generator.model());
    Ok(lines)
}
