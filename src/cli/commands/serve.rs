//! Serve command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use crate::server::router;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Run the HTTP API server.
///
/// The corpus is loaded once before listening. A failed initial load is not
/// fatal: the server starts empty and answers "Dataset unavailable." until a
/// later refresh succeeds.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> Result<()> {
    let pipeline = Arc::new(Pipeline::from_settings(&settings)?);

    let spinner = Output::spinner("Loading messages...");
    let initial = pipeline.refresh().await;
    spinner.finish_and_clear();

    match initial {
        Ok(report) => Output::success(&format!("Indexed {} messages", report.records)),
        Err(e) => {
            warn!("Initial refresh failed: {}", e);
            Output::warning(&format!("Initial load failed: {}", e));
            Output::info("Serving without data; POST /refresh to retry.");
        }
    }

    if settings.refresh.interval_secs > 0 {
        pipeline
            .clone()
            .spawn_periodic_refresh(Duration::from_secs(settings.refresh.interval_secs));
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Aurora API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "GET  /ask?question=...");
    Output::kv("Status", "GET  /status");
    Output::kv("Refresh", "POST /refresh");
    if settings.refresh.interval_secs > 0 {
        Output::kv(
            "Auto-refresh",
            &format!("every {}s", settings.refresh.interval_secs),
        );
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(pipeline))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
