//! Refresh command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Fetch and index the corpus once, then report.
pub async fn run_refresh(settings: Settings) -> Result<()> {
    let pipeline = Pipeline::from_settings(&settings)?;

    let spinner = Output::spinner("Fetching and indexing messages...");
    let result = pipeline.refresh().await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            Output::success(&format!("Indexed {} messages", report.records));
            Output::kv("Source", &settings.corpus.messages_url);
            Output::kv("Dimensions", &report.dimensions.to_string());
            Output::kv("Built at", &report.built_at.to_rfc3339());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Refresh failed: {}", e));
            Err(e.into())
        }
    }
}
