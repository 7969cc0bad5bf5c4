//! Aurora - grounded question answering over a message feed
//!
//! A small retrieval-augmented generation service: it fetches short messages
//! from a provider, indexes their embeddings, and answers questions using
//! only the messages nearest to each question. When the messages do not hold
//! the answer, it says so with a fixed phrase instead of guessing.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `corpus` - Message providers
//! - `embedding` - Embedding generation
//! - `index` - Exact nearest-neighbor index and immutable snapshots
//! - `safety` - Question safety gate
//! - `retrieval` - Question-to-messages lookup
//! - `rag` - Prompt composition and answer generation
//! - `pipeline` - Refresh lifecycle and question answering
//! - `server` - HTTP API
//!
//! # Example
//!
//! ```rust,no_run
//! use aurora::config::Settings;
//! use aurora::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let pipeline = Pipeline::from_settings(&settings)?;
//!
//!     let report = pipeline.refresh().await?;
//!     println!("Indexed {} messages", report.records);
//!
//!     let response = pipeline.ask("When is the meeting?").await;
//!     println!("{}", response.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod openai;
pub mod pipeline;
pub mod rag;
pub mod retrieval;
pub mod safety;
pub mod server;
pub mod tokens;

pub use error::{AuroraError, Result};
