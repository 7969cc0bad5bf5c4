//! Offline feature-hashing embedder.
//!
//! Maps lowercase word tokens into a fixed number of buckets with FNV-1a and
//! L2-normalizes the counts. Texts sharing words land close together, which
//! is enough for demos and tests without a model backend.

use super::{validate_inputs, Embedder};
use crate::error::Result;
use async_trait::async_trait;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic bag-of-words embedder.
pub struct HashingEmbedder {
    dimensions: usize,
    max_input_tokens: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            max_input_tokens: usize::MAX,
        }
    }

    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = max_input_tokens;
        self
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(&token.to_lowercase()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes()
        .fold(FNV_OFFSET, |hash, b| (hash ^ b as u64).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        validate_inputs(texts, self.max_input_tokens)?;
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::squared_euclidean;

    #[tokio::test]
    async fn test_deterministic_and_sized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("The meeting is at 3pm.").await.unwrap();
        let b = embedder.embed("The meeting is at 3pm.").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn test_shared_words_are_closer() {
        let embedder = HashingEmbedder::new(256);
        let texts = vec![
            "What time is the meeting?".to_string(),
            "The meeting is at 3pm.".to_string(),
            "Bananas are yellow.".to_string(),
        ];
        let v = embedder.embed_batch(&texts).await.unwrap();
        assert!(squared_euclidean(&v[0], &v[1]) < squared_euclidean(&v[0], &v[2]));
    }

    #[tokio::test]
    async fn test_empty_text_fails() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed("").await.is_err());
    }
}
