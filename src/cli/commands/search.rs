//! Search command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, limit: usize, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::from_settings(&settings)?;

    let spinner = Output::spinner("Loading messages...");
    let refreshed = pipeline.refresh().await;
    spinner.finish_and_clear();
    if let Err(e) = refreshed {
        Output::error(&format!("Could not load messages: {}", e));
        return Err(e.into());
    }

    let hits = pipeline.search(query, limit).await?;
    if hits.is_empty() {
        Output::warning("No messages found.");
    } else {
        Output::success(&format!("Found {} messages", hits.len()));
        for (i, hit) in hits.iter().enumerate() {
            Output::message_hit(i + 1, &hit.record.user_name, &hit.record.message, hit.distance);
        }
    }

    Ok(())
}
