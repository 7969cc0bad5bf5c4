//! HTTP message provider.

use super::{normalize_items, CorpusSource, MessageRecord};
use crate::error::{AuroraError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Response body of the messages endpoint.
#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Fetches messages from a JSON endpoint returning `{"items": [...]}`.
pub struct HttpCorpusSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCorpusSource {
    /// Create a source for `url` with a per-request timeout.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuroraError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl CorpusSource for HttpCorpusSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_corpus(&self) -> Result<Vec<MessageRecord>> {
        debug!("Fetching messages");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuroraError::UpstreamUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuroraError::UpstreamUnavailable(format!(
                "provider returned status {}",
                status
            )));
        }

        let page: MessagesPage = response.json().await.map_err(|e| {
            AuroraError::UpstreamUnavailable(format!("invalid response body: {}", e))
        })?;

        let fetched = page.items.len();
        let records = normalize_items(page.items);
        info!("Fetched {} messages ({} usable)", fetched, records.len());

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/messages", addr)
    }

    #[tokio::test]
    async fn test_fetch_corpus() {
        let app = Router::new().route(
            "/messages",
            get(|| async {
                Json(json!({
                    "total": 2,
                    "items": [
                        {"id": "1", "user_name": "alice", "message": "The meeting is at 3pm."},
                        {"id": "2", "user_name": "bob", "message": "I'll bring snacks."}
                    ]
                }))
            }),
        );
        let url = serve(app).await;

        let source = HttpCorpusSource::new(&url, Duration::from_secs(5)).unwrap();
        let records = source.fetch_corpus().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].user_name, "alice");
        assert_eq!(records[1].message, "I'll bring snacks.");
    }

    #[tokio::test]
    async fn test_missing_items_is_empty_corpus() {
        let app = Router::new().route("/messages", get(|| async { Json(json!({})) }));
        let url = serve(app).await;

        let source = HttpCorpusSource::new(&url, Duration::from_secs(5)).unwrap();
        assert!(source.fetch_corpus().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_unavailable() {
        let app = Router::new().route(
            "/messages",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let url = serve(app).await;

        let source = HttpCorpusSource::new(&url, Duration::from_secs(5)).unwrap();
        let err = source.fetch_corpus().await.unwrap_err();
        assert!(matches!(err, AuroraError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unreachable_is_upstream_unavailable() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source =
            HttpCorpusSource::new(&format!("http://{}/messages", addr), Duration::from_secs(2))
                .unwrap();
        let err = source.fetch_corpus().await.unwrap_err();
        assert!(matches!(err, AuroraError::UpstreamUnavailable(_)));
    }
}
