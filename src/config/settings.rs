//! Configuration settings for Aurora.

use crate::error::{AuroraError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default public message feed.
const DEFAULT_MESSAGES_URL: &str = "https://november7-730026606190.europe-west1.run.app/messages";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub corpus: CorpusSettings,
    pub embedding: EmbeddingSettings,
    pub safety: SafetySettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub refresh: RefreshSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Message provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    /// Endpoint returning `{"items": [...]}`.
    pub messages_url: String,
    /// Timeout for a single fetch.
    pub fetch_timeout_secs: u64,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self {
            messages_url: DEFAULT_MESSAGES_URL.to_string(),
            fetch_timeout_secs: 30,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai, hashing).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
    /// Maximum number of texts sent in one embedding request.
    pub batch_size: usize,
    /// Per-text input budget, in estimated tokens.
    pub max_input_tokens: usize,
    /// Timeout for one embedding call (a whole corpus batch or one question).
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 384,
            batch_size: 100,
            max_input_tokens: 8191,
            timeout_secs: 60,
        }
    }
}

/// Toxicity classifier backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SafetyProvider {
    /// Text-classification inference endpoint (e.g. a hosted toxic-bert).
    #[default]
    Http,
    /// No classification; every question is treated as safe.
    Disabled,
}

impl std::str::FromStr for SafetyProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" | "huggingface" => Ok(SafetyProvider::Http),
            "disabled" | "none" | "off" => Ok(SafetyProvider::Disabled),
            _ => Err(format!("Unknown safety provider: {}", s)),
        }
    }
}

impl std::fmt::Display for SafetyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyProvider::Http => write!(f, "http"),
            SafetyProvider::Disabled => write!(f, "disabled"),
        }
    }
}

/// Safety gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    pub provider: SafetyProvider,
    /// Classification endpoint for the `http` provider.
    pub endpoint: String,
    /// Environment variable holding the bearer token for the endpoint.
    pub token_env: String,
    /// Questions labelled unsafe with a score above this are rejected.
    pub threshold: f32,
    /// Raw classifier labels that mean "unsafe" (case-insensitive).
    pub unsafe_labels: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            provider: SafetyProvider::Http,
            endpoint: "https://api-inference.huggingface.co/models/unitary/toxic-bert".to_string(),
            token_env: "HF_API_TOKEN".to_string(),
            threshold: 0.5,
            unsafe_labels: vec!["toxic".to_string(), "label_1".to_string()],
            timeout_secs: 15,
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of messages retrieved per question.
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 5 }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// LLM model for answer generation.
    pub model: String,
    /// Output budget in tokens.
    pub max_tokens: u32,
    /// Prompt budget in estimated tokens.
    pub max_input_tokens: usize,
    /// Wall-clock budget for one generation call.
    pub timeout_secs: u64,
    /// Generation calls allowed to run at the same time.
    pub max_concurrent: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1024,
            max_input_tokens: 1024,
            timeout_secs: 60,
            max_concurrent: 4,
        }
    }
}

/// Corpus refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Background refresh period; 0 disables periodic refresh.
    pub interval_secs: u64,
    /// Fetch attempts per refresh.
    pub retry_attempts: u32,
    /// Backoff between attempts, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            retry_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment variables override values from the file.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AURORA_MESSAGES_URL") {
            self.corpus.messages_url = v;
        }
        if let Some(v) = lookup("AURORA_TOP_K") {
            self.retrieval.k = parse_override("AURORA_TOP_K", &v)?;
        }
        if let Some(v) = lookup("AURORA_TOXICITY_THRESHOLD") {
            self.safety.threshold = parse_override("AURORA_TOXICITY_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("AURORA_SAFETY_PROVIDER") {
            self.safety.provider = v.parse().map_err(AuroraError::Config)?;
        }
        if let Some(v) = lookup("AURORA_MAX_TOKENS") {
            self.generation.max_tokens = parse_override("AURORA_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("AURORA_GENERATION_TIMEOUT_SECS") {
            self.generation.timeout_secs = parse_override("AURORA_GENERATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("AURORA_GENERATION_MODEL") {
            self.generation.model = v;
        }
        if let Some(v) = lookup("AURORA_EMBEDDING_PROVIDER") {
            self.embedding.provider = v.trim().to_lowercase();
        }
        if let Some(v) = lookup("AURORA_EMBEDDING_BATCH_SIZE") {
            self.embedding.batch_size = parse_override("AURORA_EMBEDDING_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("AURORA_REFRESH_INTERVAL_SECS") {
            self.refresh.interval_secs = parse_override("AURORA_REFRESH_INTERVAL_SECS", &v)?;
        }
        Ok(())
    }

    /// Check that the settings describe a usable pipeline.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.corpus.messages_url).map_err(|e| {
            AuroraError::Config(format!(
                "corpus.messages_url '{}' is not a valid URL: {}",
                self.corpus.messages_url, e
            ))
        })?;

        if !(0.0..=1.0).contains(&self.safety.threshold) {
            return Err(AuroraError::Config(format!(
                "safety.threshold must be within [0, 1], got {}",
                self.safety.threshold
            )));
        }

        if !matches!(self.embedding.provider.as_str(), "openai" | "hashing") {
            return Err(AuroraError::Config(format!(
                "Unknown embedding provider: {}",
                self.embedding.provider
            )));
        }

        if self.safety.provider == SafetyProvider::Http {
            url::Url::parse(&self.safety.endpoint).map_err(|e| {
                AuroraError::Config(format!("safety.endpoint is not a valid URL: {}", e))
            })?;
        }

        let positive = [
            ("embedding.batch_size", self.embedding.batch_size as u64),
            ("embedding.dimensions", self.embedding.dimensions as u64),
            ("generation.max_tokens", self.generation.max_tokens as u64),
            ("generation.max_concurrent", self.generation.max_concurrent as u64),
            ("generation.timeout_secs", self.generation.timeout_secs),
            ("refresh.retry_attempts", self.refresh.retry_attempts as u64),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(AuroraError::Config(format!("{} must be greater than 0", key)));
            }
        }

        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AuroraError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("aurora")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AuroraError::Config(format!("{}='{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retrieval.k, 5);
        assert_eq!(settings.safety.threshold, 0.5);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("AURORA_MESSAGES_URL", "http://localhost:9000/messages"),
            ("AURORA_TOP_K", "3"),
            ("AURORA_TOXICITY_THRESHOLD", "0.8"),
            ("AURORA_MAX_TOKENS", "256"),
            ("AURORA_GENERATION_TIMEOUT_SECS", "5"),
            ("AURORA_EMBEDDING_BATCH_SIZE", "16"),
            ("AURORA_SAFETY_PROVIDER", "disabled"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.corpus.messages_url, "http://localhost:9000/messages");
        assert_eq!(settings.retrieval.k, 3);
        assert_eq!(settings.safety.threshold, 0.8);
        assert_eq!(settings.generation.max_tokens, 256);
        assert_eq!(settings.generation.timeout_secs, 5);
        assert_eq!(settings.embedding.batch_size, 16);
        assert_eq!(settings.safety.provider, SafetyProvider::Disabled);
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(|k| (k == "AURORA_TOP_K").then(|| "five".to_string()))
            .unwrap_err();
        assert!(matches!(err, AuroraError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.safety.threshold = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.corpus.messages_url = "not a url".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.embedding.batch_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[retrieval]\nk = 7\n\n[safety]\nprovider = \"disabled\"\nthreshold = 0.7\n",
        )
        .unwrap();

        // Parse the file without consulting the process environment.
        let mut settings: Settings =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        settings.apply_overrides(|_| None).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.retrieval.k, 7);
        assert_eq!(settings.safety.provider, SafetyProvider::Disabled);
        assert_eq!(settings.safety.threshold, 0.7);
        // Untouched sections keep their defaults.
        assert_eq!(settings.generation.max_tokens, 1024);
    }

    #[test]
    fn test_save_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.server.port = 9123;
        settings.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = toml::from_str(&content).unwrap();
        assert_eq!(loaded.server.port, 9123);
    }
}
