//! Question safety gate.
//!
//! Classifiers report their own label vocabulary (`toxic`, `LABEL_1`, ...).
//! A [`LabelNormalizer`] maps that vocabulary onto [`SafetyLabel`] so the
//! pipeline only ever sees `Safe`/`Unsafe` plus a confidence score, and a
//! [`SafetyPolicy`] decides whether a verdict rejects the question.

mod http;

pub use http::HttpToxicityClassifier;

use crate::config::SafetySettings;
use crate::error::Result;
use async_trait::async_trait;

/// Normalized classifier outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLabel {
    Safe,
    Unsafe,
}

/// Classification of one question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub label: SafetyLabel,
    /// Classifier confidence in `label`, within `[0, 1]`.
    pub score: f32,
}

impl Verdict {
    pub fn safe(score: f32) -> Self {
        Self {
            label: SafetyLabel::Safe,
            score: score.clamp(0.0, 1.0),
        }
    }

    pub fn unsafe_with(score: f32) -> Self {
        Self {
            label: SafetyLabel::Unsafe,
            score: score.clamp(0.0, 1.0),
        }
    }
}

/// Trait for question classifiers.
#[async_trait]
pub trait SafetyGate: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Verdict>;
}

/// Maps raw classifier labels onto [`SafetyLabel`].
///
/// A label is unsafe when it case-insensitively equals one of the configured
/// unsafe labels; every other label is safe. The defaults cover
/// `unitary/toxic-bert` (`toxic`) and generic binary heads whose positive
/// class is exported as `LABEL_1`.
#[derive(Debug, Clone)]
pub struct LabelNormalizer {
    unsafe_labels: Vec<String>,
}

impl LabelNormalizer {
    pub fn new<I, S>(unsafe_labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            unsafe_labels: unsafe_labels
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    pub fn normalize(&self, raw_label: &str) -> SafetyLabel {
        let raw = raw_label.trim().to_lowercase();
        if self.unsafe_labels.iter().any(|l| *l == raw) {
            SafetyLabel::Unsafe
        } else {
            SafetyLabel::Safe
        }
    }
}

impl Default for LabelNormalizer {
    fn default() -> Self {
        Self::new(SafetySettings::default().unsafe_labels)
    }
}

/// Rejection rule applied to verdicts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyPolicy {
    /// Unsafe verdicts scoring strictly above this are rejected.
    pub threshold: f32,
}

impl SafetyPolicy {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn rejects(&self, verdict: &Verdict) -> bool {
        verdict.label == SafetyLabel::Unsafe && verdict.score > self.threshold
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// Gate used when classification is turned off.
pub struct DisabledSafetyGate;

#[async_trait]
impl SafetyGate for DisabledSafetyGate {
    async fn classify(&self, _text: &str) -> Result<Verdict> {
        Ok(Verdict::safe(0.0))
    }
}
