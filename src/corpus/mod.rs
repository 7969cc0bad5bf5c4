//! Message corpus sources.
//!
//! A corpus source fetches the current set of messages from a provider and
//! normalizes them into [`MessageRecord`]s. Sources do not retry; the
//! pipeline owns the retry policy.

mod http;

pub use http::HttpCorpusSource;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single message from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Position of this record in the snapshot it was fetched into.
    pub ordinal: usize,
    /// Author display name.
    pub user_name: String,
    /// Message text.
    pub message: String,
    /// Provider timestamp, kept verbatim.
    pub timestamp: Option<String>,
}

impl MessageRecord {
    pub fn new(ordinal: usize, user_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ordinal,
            user_name: user_name.into(),
            message: message.into(),
            timestamp: None,
        }
    }

    /// Render as a context line: `user_name: message`.
    pub fn as_context_line(&self) -> String {
        format!("{}: {}", self.user_name, self.message)
    }
}

/// Trait for message providers.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    /// Fetch the full current corpus.
    async fn fetch_corpus(&self) -> Result<Vec<MessageRecord>>;
}

/// Wire shape of one provider item. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct RawMessage {
    user_name: String,
    message: String,
    #[serde(default)]
    timestamp: Option<serde_json::Value>,
}

/// Normalize provider items into ordered records.
///
/// Items missing `user_name`/`message`, or with a blank message, are skipped
/// with a warning. Ordinals are assigned after skipping and are dense.
pub fn normalize_items(items: Vec<serde_json::Value>) -> Vec<MessageRecord> {
    let mut records = Vec::with_capacity(items.len());

    for (position, item) in items.into_iter().enumerate() {
        let raw: RawMessage = match serde_json::from_value(item) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping malformed message at position {}: {}", position, e);
                continue;
            }
        };

        if raw.message.trim().is_empty() {
            warn!("Skipping empty message at position {}", position);
            continue;
        }

        let timestamp = raw.timestamp.and_then(|ts| match ts {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        });

        records.push(MessageRecord {
            ordinal: records.len(),
            user_name: raw.user_name,
            message: raw.message,
            timestamp,
        });
    }

    records
}

/// A fixed in-memory corpus.
pub struct StaticCorpusSource {
    records: Vec<MessageRecord>,
}

impl StaticCorpusSource {
    /// Build from `(user_name, message)` pairs; ordinals follow input order.
    pub fn from_pairs<I, U, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (U, M)>,
        U: Into<String>,
        M: Into<String>,
    {
        let records = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (user, message))| MessageRecord::new(i, user, message))
            .collect();
        Self { records }
    }

    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

#[async_trait]
impl CorpusSource for StaticCorpusSource {
    async fn fetch_corpus(&self) -> Result<Vec<MessageRecord>> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_items() {
        let items = vec![
            json!({"id": "a1", "user_name": "alice", "message": "The meeting is at 3pm.", "timestamp": "2025-01-01T10:00:00Z"}),
            json!({"user_name": "bob"}),
            json!({"user_name": "carol", "message": "   "}),
            json!({"user_name": "dave", "message": "Booked the venue.", "timestamp": 1700000000}),
        ];

        let records = normalize_items(items);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ordinal, 0);
        assert_eq!(records[0].user_name, "alice");
        assert_eq!(records[0].timestamp.as_deref(), Some("2025-01-01T10:00:00Z"));
        assert_eq!(records[1].ordinal, 1);
        assert_eq!(records[1].user_name, "dave");
        assert_eq!(records[1].timestamp.as_deref(), Some("1700000000"));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let items = vec![
            json!({"user_name": "alice", "message": "hi"}),
            json!({"user_name": "alice", "message": "hi"}),
        ];
        assert_eq!(normalize_items(items).len(), 2);
    }

    #[test]
    fn test_context_line() {
        let record = MessageRecord::new(0, "alice", "The meeting is at 3pm.");
        assert_eq!(record.as_context_line(), "alice: The meeting is at 3pm.");
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticCorpusSource::from_pairs([("alice", "one"), ("bob", "two")]);
        let records = source.fetch_corpus().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].ordinal, 1);
        assert!(StaticCorpusSource::empty().fetch_corpus().await.unwrap().is_empty());
    }
}
