//! OpenAI client configuration.

use crate::error::{AuroraError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

pub type OpenAIClient = Client<OpenAIConfig>;

/// Create an OpenAI client whose HTTP requests time out after `timeout`.
pub fn create_client_with_timeout(timeout: Duration) -> Result<OpenAIClient> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AuroraError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}
