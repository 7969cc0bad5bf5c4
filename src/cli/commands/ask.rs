//! Ask command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{AskOutcome, Pipeline};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    k: Option<usize>,
    show_sources: bool,
    settings: Settings,
) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let pipeline = Pipeline::from_settings(&settings)?;
    let k = k.unwrap_or(pipeline.config().k);

    let spinner = Output::spinner("Loading messages...");
    let refreshed = pipeline.refresh().await;
    spinner.finish_and_clear();
    if let Err(e) = refreshed {
        Output::warning(&format!("Could not load messages: {}", e));
    }

    let spinner = Output::spinner("Thinking...");
    let outcome = pipeline.ask_with_k(question, k).await;
    spinner.finish_and_clear();

    println!("\n{}\n", outcome.answer());

    match &outcome {
        AskOutcome::Answered { sources, .. } if show_sources => {
            Output::header("Sources");
            for (i, source) in sources.iter().enumerate() {
                Output::message_hit(
                    i + 1,
                    &source.record.user_name,
                    &source.record.message,
                    source.distance,
                );
            }
        }
        AskOutcome::Failed { request_id, stage } => {
            Output::error(&format!(
                "Request {} failed at the {} stage (run with -v for details)",
                request_id, stage
            ));
        }
        _ => {}
    }

    Ok(())
}
