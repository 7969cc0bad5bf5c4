//! Error types for Aurora.

use thiserror::Error;

/// Library-level error type for Aurora operations.
#[derive(Error, Debug)]
pub enum AuroraError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Index not ready: no snapshot has been built yet")]
    IndexNotReady,

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Safety classification failed: {0}")]
    Safety(String),

    #[error("Answer generation timed out after {0} seconds")]
    GenerationTimeout(u64),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

impl AuroraError {
    /// Name of the pipeline stage an error belongs to, for logging.
    pub fn stage(&self) -> &'static str {
        match self {
            AuroraError::UpstreamUnavailable(_) => "fetch",
            AuroraError::IndexNotReady | AuroraError::Index(_) => "index",
            AuroraError::Embedding(_) => "embedding",
            AuroraError::Safety(_) => "safety",
            AuroraError::GenerationTimeout(_) | AuroraError::Generation(_) => "generation",
            AuroraError::OpenAI(_) | AuroraError::Http(_) => "upstream",
            _ => "internal",
        }
    }
}

/// Result type alias for Aurora operations.
pub type Result<T> = std::result::Result<T, AuroraError>;
