//! Text-classification endpoint client.
//!
//! Speaks the inference API shape used for hosted classifiers such as
//! `unitary/toxic-bert`: `POST {"inputs": text}` answered with either
//! `[{"label", "score"}, ...]` or `[[{"label", "score"}, ...]]`.

use super::{LabelNormalizer, SafetyGate, Verdict};
use crate::config::SafetySettings;
use crate::error::{AuroraError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl ClassificationResponse {
    /// Highest-scoring label across the response.
    fn top(self) -> Option<LabelScore> {
        let scores = match self {
            ClassificationResponse::Nested(batches) => batches.into_iter().flatten().collect(),
            ClassificationResponse::Flat(scores) => scores,
        };
        scores
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Toxicity classifier backed by an HTTP inference endpoint.
pub struct HttpToxicityClassifier {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    normalizer: LabelNormalizer,
}

impl HttpToxicityClassifier {
    pub fn new(
        endpoint: &str,
        token: Option<String>,
        normalizer: LabelNormalizer,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuroraError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.filter(|t| !t.is_empty()),
            normalizer,
        })
    }

    /// Create from settings, reading the token from `settings.token_env`.
    pub fn from_settings(settings: &SafetySettings) -> Result<Self> {
        Self::new(
            &settings.endpoint,
            std::env::var(&settings.token_env).ok(),
            LabelNormalizer::new(&settings.unsafe_labels),
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl SafetyGate for HttpToxicityClassifier {
    #[instrument(skip(self, text))]
    async fn classify(&self, text: &str) -> Result<Verdict> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuroraError::Safety(format!("classifier request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuroraError::Safety(format!(
                "classifier returned status {}",
                status
            )));
        }

        let body: ClassificationResponse = response
            .json()
            .await
            .map_err(|e| AuroraError::Safety(format!("invalid classifier response: {}", e)))?;

        let top = body
            .top()
            .ok_or_else(|| AuroraError::Safety("classifier returned no labels".to_string()))?;

        debug!(label = %top.label, score = top.score, "Classified question");

        Ok(Verdict {
            label: self.normalizer.normalize(&top.label),
            score: top.score.clamp(0.0, 1.0),
        })
    }
}
