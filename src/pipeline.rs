//! Pipeline orchestrator for Aurora.
//!
//! Owns the current [`IndexSnapshot`] and coordinates both halves of the
//! system: refresh (fetch, embed, build, swap) and ask (safety gate,
//! retrieval, prompt, generation).
//!
//! The snapshot pointer is the only shared mutable state. Refresh is the
//! single writer and replaces the whole `Arc`; readers clone the `Arc` and
//! keep using it for the rest of their request, so a request never sees a
//! half-built index. Infrastructure failures during `ask` are turned into a
//! fixed answer here and never escape to the caller.

use crate::config::{Prompts, SafetyProvider, Settings};
use crate::corpus::{CorpusSource, HttpCorpusSource, MessageRecord};
use crate::embedding::{Embedder, HashingEmbedder, OpenAIEmbedder};
use crate::error::{AuroraError, Result};
use crate::index::{IndexSnapshot, RetrievalResult};
use crate::rag::{AnswerGenerator, OpenAIGenerator, PromptComposer};
use crate::retrieval::Retriever;
use crate::safety::{DisabledSafetyGate, HttpToxicityClassifier, SafetyGate, SafetyPolicy};
use crate::tokens::truncate_to_tokens;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

/// Answer when no snapshot is available or the corpus is empty.
pub const DATASET_UNAVAILABLE: &str = "Dataset unavailable.";

/// Answer when the safety gate rejects a question.
pub const UNSAFE_QUESTION: &str =
    "This question contains unsafe or toxic content and cannot be processed.";

/// Answer when retrieval returns nothing from a non-empty corpus.
pub const NO_MATCHES: &str = "No relevant messages were found for this question.";

/// Answer when a stage fails while answering.
pub const ANSWER_FAILED: &str = "Sorry, something went wrong while answering this question.";

/// The externally visible result of a question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// Detailed result of a question, before it is reduced to an answer.
#[derive(Debug, Clone)]
pub enum AskOutcome {
    /// The generator produced an answer from these messages.
    Answered {
        answer: String,
        sources: RetrievalResult,
    },
    /// The safety gate rejected the question.
    Rejected { score: f32 },
    /// No snapshot yet, or the snapshot holds no messages.
    Unavailable,
    /// Retrieval returned no messages.
    NoMatches,
    /// A stage failed; details were logged under the request id.
    Failed { request_id: Uuid, stage: &'static str },
}

impl AskOutcome {
    pub fn answer(&self) -> &str {
        match self {
            AskOutcome::Answered { answer, .. } => answer,
            AskOutcome::Rejected { .. } => UNSAFE_QUESTION,
            AskOutcome::Unavailable => DATASET_UNAVAILABLE,
            AskOutcome::NoMatches => NO_MATCHES,
            AskOutcome::Failed { .. } => ANSWER_FAILED,
        }
    }

    pub fn into_response(self) -> AnswerResponse {
        AnswerResponse {
            answer: self.answer().to_string(),
        }
    }
}

/// Lifecycle state of the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing has been loaded.
    Empty,
    /// A refresh is in flight.
    Loading,
    /// A snapshot is being served.
    Ready,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Empty => write!(f, "empty"),
            PipelineState::Loading => write!(f, "loading"),
            PipelineState::Ready => write!(f, "ready"),
        }
    }
}

/// Point-in-time view of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    /// Records in the served snapshot, if any.
    pub records: Option<usize>,
    pub built_at: Option<DateTime<Utc>>,
    /// Error from the most recent failed refresh, cleared on success.
    pub last_error: Option<String>,
}

/// Summary of a successful refresh.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub records: usize,
    pub dimensions: usize,
    pub built_at: DateTime<Utc>,
}

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Messages retrieved per question.
    pub k: usize,
    pub safety_policy: SafetyPolicy,
    pub fetch_timeout: Duration,
    pub embedding_timeout: Duration,
    pub generation_timeout: Duration,
    /// Generation calls allowed in flight at once.
    pub max_concurrent_generations: usize,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            k: settings.retrieval.k,
            safety_policy: SafetyPolicy::new(settings.safety.threshold),
            fetch_timeout: Duration::from_secs(settings.corpus.fetch_timeout_secs),
            embedding_timeout: Duration::from_secs(settings.embedding.timeout_secs),
            generation_timeout: Duration::from_secs(settings.generation.timeout_secs),
            max_concurrent_generations: settings.generation.max_concurrent.max(1),
            retry_attempts: settings.refresh.retry_attempts.max(1),
            retry_backoff: Duration::from_millis(settings.refresh.retry_backoff_ms),
        }
    }
}

/// Clears the loading flag even if a refresh future is dropped mid-way.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The question answering pipeline.
pub struct Pipeline {
    source: Arc<dyn CorpusSource>,
    embedder: Arc<dyn Embedder>,
    safety: Arc<dyn SafetyGate>,
    generator: Arc<dyn AnswerGenerator>,
    retriever: Retriever,
    composer: PromptComposer,
    config: PipelineConfig,
    snapshot: RwLock<Option<Arc<IndexSnapshot>>>,
    last_error: RwLock<Option<String>>,
    loading: AtomicBool,
    refresh_lock: Mutex<()>,
    generation_permits: Semaphore,
}

impl Pipeline {
    /// Create a pipeline from explicit components.
    pub fn new(
        source: Arc<dyn CorpusSource>,
        embedder: Arc<dyn Embedder>,
        safety: Arc<dyn SafetyGate>,
        generator: Arc<dyn AnswerGenerator>,
        composer: PromptComposer,
        config: PipelineConfig,
    ) -> Self {
        let retriever = Retriever::new(embedder.clone()).with_timeout(config.embedding_timeout);
        let generation_permits = Semaphore::new(config.max_concurrent_generations.max(1));

        Self {
            source,
            embedder,
            safety,
            generator,
            retriever,
            composer,
            config,
            snapshot: RwLock::new(None),
            last_error: RwLock::new(None),
            loading: AtomicBool::new(false),
            refresh_lock: Mutex::new(()),
            generation_permits,
        }
    }

    /// Create a pipeline with the backends named in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let source: Arc<dyn CorpusSource> = Arc::new(HttpCorpusSource::new(
            &settings.corpus.messages_url,
            Duration::from_secs(settings.corpus.fetch_timeout_secs),
        )?);

        let embedder: Arc<dyn Embedder> = match settings.embedding.provider.as_str() {
            "hashing" => Arc::new(
                HashingEmbedder::new(settings.embedding.dimensions as usize)
                    .with_max_input_tokens(settings.embedding.max_input_tokens),
            ),
            "openai" => Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?),
            other => {
                return Err(AuroraError::Config(format!(
                    "Unknown embedding provider: {}",
                    other
                )))
            }
        };

        let safety: Arc<dyn SafetyGate> = match settings.safety.provider {
            SafetyProvider::Http => Arc::new(HttpToxicityClassifier::from_settings(&settings.safety)?),
            SafetyProvider::Disabled => {
                warn!("Safety gate disabled; questions are not screened");
                Arc::new(DisabledSafetyGate)
            }
        };

        let generator: Arc<dyn AnswerGenerator> =
            Arc::new(OpenAIGenerator::from_settings(&settings.generation)?);

        Ok(Self::new(
            source,
            embedder,
            safety,
            generator,
            PromptComposer::new(&prompts),
            PipelineConfig::from_settings(settings),
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The snapshot currently served, if one has been built.
    pub fn current_snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn state(&self) -> PipelineState {
        if self.loading.load(Ordering::SeqCst) {
            PipelineState::Loading
        } else if self.current_snapshot().is_some() {
            PipelineState::Ready
        } else {
            PipelineState::Empty
        }
    }

    pub fn status(&self) -> PipelineStatus {
        let snapshot = self.current_snapshot();
        PipelineStatus {
            state: self.state(),
            records: snapshot.as_ref().map(|s| s.len()),
            built_at: snapshot.as_ref().map(|s| s.built_at()),
            last_error: self
                .last_error
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    /// Answer a question.
    pub async fn ask(&self, question: &str) -> AnswerResponse {
        self.ask_detailed(question).await.into_response()
    }

    /// Answer a question, keeping the retrieved sources and failure details.
    pub async fn ask_detailed(&self, question: &str) -> AskOutcome {
        self.ask_with_k(question, self.config.k).await
    }

    /// Answer a question retrieving `k` messages instead of the configured k.
    pub async fn ask_with_k(&self, question: &str, k: usize) -> AskOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("ask", %request_id);

        async {
            match self.answer(question, k).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(stage = e.stage(), error = %e, "Question failed");
                    AskOutcome::Failed {
                        request_id,
                        stage: e.stage(),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn answer(&self, question: &str, k: usize) -> Result<AskOutcome> {
        // Held for the whole request; a concurrent refresh swaps the pointer
        // without touching this snapshot.
        let Some(snapshot) = self.current_snapshot() else {
            info!("No snapshot built yet");
            return Ok(AskOutcome::Unavailable);
        };

        let verdict = self.safety.classify(question).await?;
        if self.config.safety_policy.rejects(&verdict) {
            info!(score = verdict.score, "Question rejected by safety gate");
            return Ok(AskOutcome::Rejected {
                score: verdict.score,
            });
        }

        if snapshot.is_empty() {
            info!("Snapshot holds no messages");
            return Ok(AskOutcome::Unavailable);
        }

        let sources = self
            .retriever
            .retrieve(question, k, Some(snapshot.as_ref()))
            .await?;
        if sources.is_empty() {
            return Ok(AskOutcome::NoMatches);
        }

        let prompt =
            self.composer
                .compose_within(question, &sources, self.generator.max_input_tokens());

        let answer = {
            let _permit = self
                .generation_permits
                .acquire()
                .await
                .map_err(|e| AuroraError::Generation(e.to_string()))?;

            let budget = self.config.generation_timeout;
            tokio::time::timeout(budget, self.generator.generate(&prompt))
                .await
                .map_err(|_| AuroraError::GenerationTimeout(budget.as_secs()))??
        };

        info!(sources = sources.len(), "Answered question");
        Ok(AskOutcome::Answered { answer, sources })
    }

    /// Retrieve the messages nearest to `query` without generating an answer.
    pub async fn search(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let snapshot = self.current_snapshot();
        self.retriever.retrieve(query, k, snapshot.as_deref()).await
    }

    /// Fetch the corpus, embed it, build a snapshot and publish it.
    ///
    /// On failure the previously published snapshot stays in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let _writer = self.refresh_lock.lock().await;
        let _loading = LoadingGuard::enter(&self.loading);

        match self.build_snapshot().await {
            Ok(snapshot) => {
                let report = RefreshReport {
                    records: snapshot.len(),
                    dimensions: snapshot.dimensions(),
                    built_at: snapshot.built_at(),
                };

                *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) =
                    Some(Arc::new(snapshot));
                *self.last_error.write().unwrap_or_else(|e| e.into_inner()) = None;

                info!("Published snapshot with {} messages", report.records);
                Ok(report)
            }
            Err(e) => {
                error!(stage = e.stage(), error = %e, "Refresh failed; keeping previous snapshot");
                *self.last_error.write().unwrap_or_else(|e| e.into_inner()) = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn build_snapshot(&self) -> Result<IndexSnapshot> {
        let records = self.fetch_with_retry().await?;

        let token_budget = self.embedder.max_input_tokens();
        let texts: Vec<String> = records
            .iter()
            .map(|r| {
                let text = truncate_to_tokens(&r.message, token_budget);
                if text.len() < r.message.len() {
                    debug!(ordinal = r.ordinal, "Cut message to the embedding budget");
                }
                text.to_string()
            })
            .collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            let budget = self.config.embedding_timeout;
            tokio::time::timeout(budget, self.embedder.embed_batch(&texts))
                .await
                .map_err(|_| {
                    AuroraError::Embedding(format!("corpus embedding timed out after {:?}", budget))
                })??
        };

        IndexSnapshot::build(records, &vectors)
    }

    async fn fetch_with_retry(&self) -> Result<Vec<MessageRecord>> {
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = tokio::time::timeout(self.config.fetch_timeout, self.source.fetch_corpus())
                .await
                .unwrap_or_else(|_| {
                    Err(AuroraError::UpstreamUnavailable(format!(
                        "fetch timed out after {:?}",
                        self.config.fetch_timeout
                    )))
                });

            match result {
                Err(AuroraError::UpstreamUnavailable(reason)) if attempt < attempts => {
                    warn!(
                        "Fetch attempt {}/{} failed: {}; retrying",
                        attempt, attempts, reason
                    );
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Refresh every `interval` in the background, logging failures.
    ///
    /// The first refresh happens one interval after the call.
    pub fn spawn_periodic_refresh(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    warn!("Periodic refresh failed: {}", e);
                }
            }
        })
    }
}
