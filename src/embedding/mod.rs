//! Embedding generation for semantic retrieval.
//!
//! The same batch entry point embeds the corpus at refresh time and each
//! question (as a batch of one) at query time, so both live in the same
//! vector space.

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAIEmbedder;

use crate::error::{AuroraError, Result};
use crate::tokens::estimate_tokens;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts, one per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text through the batch path.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AuroraError::Embedding("Empty embedding response".to_string()))
    }

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Per-text input budget in estimated tokens. Callers cut text to this
    /// with [`truncate_to_tokens`](crate::tokens::truncate_to_tokens).
    fn max_input_tokens(&self) -> usize {
        usize::MAX
    }
}

/// Reject empty inputs and inputs over the model budget.
///
/// Callers are expected to truncate long text to
/// [`Embedder::max_input_tokens`] before embedding.
pub fn validate_inputs(texts: &[String], max_input_tokens: usize) -> Result<()> {
    for (i, text) in texts.iter().enumerate() {
        if text.trim().is_empty() {
            return Err(AuroraError::Embedding(format!("input {} is empty", i)));
        }
        let tokens = estimate_tokens(text);
        if tokens > max_input_tokens {
            return Err(AuroraError::Embedding(format!(
                "input {} is ~{} tokens, over the {} token budget",
                i, tokens, max_input_tokens
            )));
        }
    }
    Ok(())
}
