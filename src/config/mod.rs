//! Configuration module for Aurora.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AskPrompts, Prompts};
pub use settings::{
    CorpusSettings, EmbeddingSettings, GeneralSettings, GenerationSettings, PromptSettings,
    RefreshSettings, RetrievalSettings, SafetyProvider, SafetySettings, ServerSettings, Settings,
};
