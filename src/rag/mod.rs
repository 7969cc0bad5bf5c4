//! Grounded answer generation.
//!
//! The prompt tells the model to answer only from the retrieved messages,
//! cite their authors, and otherwise reply with [`FALLBACK_ANSWER`].

mod generator;
pub mod prompt;

pub use generator::{normalize_answer, AnswerGenerator, OpenAIGenerator};
pub use prompt::{PromptComposer, FALLBACK_ANSWER};
