//! Immutable corpus snapshots.

use super::VectorIndex;
use crate::corpus::MessageRecord;
use crate::error::{AuroraError, Result};
use chrono::{DateTime, Utc};

/// A retrieved message with its distance to the question.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMessage {
    pub record: MessageRecord,
    /// Squared Euclidean distance (lower is closer).
    pub distance: f32,
}

/// Retrieved messages, ascending by distance.
pub type RetrievalResult = Vec<ScoredMessage>;

/// Records paired with the index built over their embeddings.
///
/// A snapshot is never mutated after construction; a refresh builds a new one
/// and swaps it in whole.
#[derive(Debug)]
pub struct IndexSnapshot {
    records: Vec<MessageRecord>,
    index: VectorIndex,
    built_at: DateTime<Utc>,
}

impl IndexSnapshot {
    /// Pair records with their vectors. Both must be in the same order.
    pub fn build(records: Vec<MessageRecord>, vectors: &[Vec<f32>]) -> Result<Self> {
        if records.len() != vectors.len() {
            return Err(AuroraError::Index(format!(
                "{} records but {} vectors",
                records.len(),
                vectors.len()
            )));
        }

        Ok(Self {
            records,
            index: VectorIndex::build(vectors)?,
            built_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    /// Nearest records for one query vector.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        let neighbors = self
            .index
            .search(&[query.to_vec()], k)?
            .into_iter()
            .next()
            .unwrap_or_default();

        Ok(neighbors
            .into_iter()
            .map(|n| ScoredMessage {
                record: self.records[n.ordinal].clone(),
                distance: n.distance,
            })
            .collect())
    }
}
