//! Answer generation.

use super::prompt::FALLBACK_ANSWER;
use crate::config::GenerationSettings;
use crate::error::{AuroraError, Result};
use crate::openai::{create_client_with_timeout, OpenAIClient};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Trait for models that turn a composed prompt into an answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate an answer for an already-bounded prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Prompt budget in estimated tokens.
    fn max_input_tokens(&self) -> usize;
}

/// Clean up raw model output.
///
/// Output is trimmed. Anything that declines using the fallback phrase, and
/// empty output, becomes exactly [`FALLBACK_ANSWER`].
pub fn normalize_answer(raw: &str) -> String {
    let answer = raw.trim();
    if answer.is_empty() || answer.contains(FALLBACK_ANSWER) {
        FALLBACK_ANSWER.to_string()
    } else {
        answer.to_string()
    }
}

/// Chat-completions backed generator with greedy decoding.
pub struct OpenAIGenerator {
    client: OpenAIClient,
    model: String,
    max_tokens: u32,
    max_input_tokens: usize,
}

impl OpenAIGenerator {
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        // The pipeline enforces the real budget; the HTTP timeout is a backstop.
        let http_timeout = Duration::from_secs(settings.timeout_secs.saturating_add(5));

        Ok(Self {
            client: create_client_with_timeout(http_timeout)?,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            max_input_tokens: settings.max_input_tokens,
        })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> =
            vec![ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()
                .map_err(|e| AuroraError::Generation(e.to_string()))?
                .into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| AuroraError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AuroraError::OpenAI(format!("Failed to generate answer: {}", e)))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| AuroraError::Generation("Empty response from LLM".to_string()))?;

        debug!("Generated answer of {} chars", answer.len());
        Ok(normalize_answer(answer))
    }

    fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }
}
