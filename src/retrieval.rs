//! Question-to-messages retrieval.

use crate::embedding::Embedder;
use crate::error::{AuroraError, Result};
use crate::index::{IndexSnapshot, RetrievalResult};
use crate::tokens::truncate_to_tokens;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embeds questions and looks them up in a snapshot.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the budget for embedding one question.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retrieve the `k` messages nearest to `question`.
    ///
    /// `None` means no snapshot has been built yet.
    #[instrument(skip(self, question, snapshot))]
    pub async fn retrieve(
        &self,
        question: &str,
        k: usize,
        snapshot: Option<&IndexSnapshot>,
    ) -> Result<RetrievalResult> {
        let snapshot = snapshot.ok_or(AuroraError::IndexNotReady)?;

        if snapshot.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let question = truncate_to_tokens(question, self.embedder.max_input_tokens());
        let query = tokio::time::timeout(self.timeout, self.embedder.embed(question))
            .await
            .map_err(|_| {
                AuroraError::Embedding(format!(
                    "question embedding timed out after {:?}",
                    self.timeout
                ))
            })??;

        let results = snapshot.search(&query, k)?;
        debug!("Retrieved {} messages", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MessageRecord;
    use crate::embedding::HashingEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed_batch(texts).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(texts.iter().map(|_| vec![0.0; 4]).collect())
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    async fn snapshot_of(embedder: &dyn Embedder, messages: &[(&str, &str)]) -> IndexSnapshot {
        let records: Vec<MessageRecord> = messages
            .iter()
            .enumerate()
            .map(|(i, (u, m))| MessageRecord::new(i, *u, *m))
            .collect();
        let texts: Vec<String> = records.iter().map(|r| r.message.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await.unwrap();
        IndexSnapshot::build(records, &vectors).unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_ranks_relevant_first() {
        let embedder = HashingEmbedder::new(256);
        let snapshot = snapshot_of(
            &embedder,
            &[
                ("bob", "Bananas are yellow."),
                ("alice", "The meeting is at 3pm."),
                ("carol", "My flight lands on Tuesday."),
            ],
        )
        .await;

        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(256)));
        let results = retriever
            .retrieve("What time is the meeting?", 1, Some(&snapshot))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.user_name, "alice");
    }

    #[tokio::test]
    async fn test_long_question_is_cut_to_budget() {
        let embedder = HashingEmbedder::new(256).with_max_input_tokens(16);
        let snapshot = snapshot_of(
            &embedder,
            &[
                ("bob", "Bananas are yellow."),
                ("alice", "The meeting is at 3pm."),
            ],
        )
        .await;

        let question = "the meeting ".repeat(5000);
        let retriever =
            Retriever::new(Arc::new(HashingEmbedder::new(256).with_max_input_tokens(16)));
        let results = retriever
            .retrieve(&question, 1, Some(&snapshot))
            .await
            .unwrap();
        assert_eq!(results[0].record.user_name, "alice");
    }

    #[tokio::test]
    async fn test_k_bounds() {
        let embedder = HashingEmbedder::new(64);
        let snapshot = snapshot_of(&embedder, &[("a", "one"), ("b", "two")]).await;
        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(64)));

        assert!(retriever
            .retrieve("one", 0, Some(&snapshot))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            retriever
                .retrieve("one", 10, Some(&snapshot))
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_not_ready_without_snapshot() {
        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(8)));
        let err = retriever.retrieve("q", 5, None).await.unwrap_err();
        assert!(matches!(err, AuroraError::IndexNotReady));
    }

    #[tokio::test]
    async fn test_empty_snapshot_skips_embedding() {
        let embedder = Arc::new(CountingEmbedder {
            inner: HashingEmbedder::new(8),
            calls: AtomicUsize::new(0),
        });
        let snapshot = IndexSnapshot::build(Vec::new(), &[]).unwrap();
        let retriever = Retriever::new(embedder.clone());

        let results = retriever.retrieve("q", 5, Some(&snapshot)).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embedding_timeout() {
        let snapshot = IndexSnapshot::build(
            vec![MessageRecord::new(0, "a", "x")],
            &[vec![0.0; 4]],
        )
        .unwrap();
        let retriever =
            Retriever::new(Arc::new(SlowEmbedder)).with_timeout(Duration::from_millis(20));

        let err = retriever.retrieve("q", 1, Some(&snapshot)).await.unwrap_err();
        assert!(matches!(err, AuroraError::Embedding(_)));
    }
}
