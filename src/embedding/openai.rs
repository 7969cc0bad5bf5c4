//! OpenAI embeddings implementation.

use super::{validate_inputs, Embedder};
use crate::config::EmbeddingSettings;
use crate::error::{AuroraError, Result};
use crate::openai::{create_client_with_timeout, OpenAIClient};
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedding requests allowed in flight for one batch.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: OpenAIClient,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_input_tokens: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::from_settings(&EmbeddingSettings::default())
    }

    /// Create an embedder from the embedding settings section.
    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(settings.timeout_secs))?,
            model: settings.model.clone(),
            dimensions: settings.dimensions as usize,
            batch_size: settings.batch_size.max(1),
            max_input_tokens: settings.max_input_tokens,
        })
    }

    async fn embed_request(&self, chunk: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(chunk.to_vec()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| AuroraError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| AuroraError::OpenAI(format!("Embedding API error: {}", e)))?;

        // Sort by index to ensure correct order
        let mut data: Vec<_> = response.data.into_iter().collect();
        data.sort_by_key(|e| e.index);

        if data.len() != chunk.len() {
            return Err(AuroraError::Embedding(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                data.len()
            )));
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

/// Split `texts` into owned request payloads of at most `batch_size` texts.
fn request_batches(texts: &[String], batch_size: usize) -> Vec<Vec<String>> {
    texts
        .chunks(batch_size.max(1))
        .map(<[String]>::to_vec)
        .collect()
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        validate_inputs(texts, self.max_input_tokens)?;

        debug!("Generating embeddings for {} texts", texts.len());

        // `buffered` keeps request order, so output order matches input order.
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(request_batches(texts, self.batch_size))
            .map(move |chunk| async move { self.embed_request(&chunk).await })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        let embeddings: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }
}
