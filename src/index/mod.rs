//! Exact nearest-neighbor index.
//!
//! Corpora here are hundreds to low thousands of short messages, so the index
//! is a flat scan under squared Euclidean distance. Results are exact and
//! fully deterministic: ties are broken by corpus ordinal.

mod snapshot;

pub use snapshot::{IndexSnapshot, RetrievalResult, ScoredMessage};

use crate::error::{AuroraError, Result};
use std::cmp::Ordering;

/// A stored vector matched by a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Corpus ordinal of the matched vector.
    pub ordinal: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// Flat index over a fixed set of vectors.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimensions: usize,
    len: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    /// Build an index from vectors in corpus order.
    ///
    /// An empty input produces an empty index. All vectors must share one
    /// non-zero dimensionality.
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };

        let dimensions = first.len();
        if dimensions == 0 {
            return Err(AuroraError::Index("vectors must not be empty".to_string()));
        }

        let mut data = Vec::with_capacity(dimensions * vectors.len());
        for (ordinal, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(AuroraError::Index(format!(
                    "vector {} has {} dimensions, expected {}",
                    ordinal,
                    vector.len(),
                    dimensions
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self {
            dimensions,
            len: vectors.len(),
            data,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dimensionality of stored vectors; 0 for an empty index.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Find up to `k` nearest vectors for each query.
    ///
    /// Each result list holds `min(k, len)` neighbors sorted by ascending
    /// distance, then ascending ordinal.
    pub fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<Neighbor>>> {
        queries.iter().map(|q| self.search_one(q, k)).collect()
    }

    fn search_one(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        if query.len() != self.dimensions {
            return Err(AuroraError::Index(format!(
                "query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(ordinal, vector)| Neighbor {
                ordinal,
                distance: squared_euclidean(query, vector),
            })
            .collect();

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, compare_neighbors);
            neighbors.truncate(k);
        }
        neighbors.sort_by(compare_neighbors);

        Ok(neighbors)
    }
}

fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}

/// Squared Euclidean distance between two vectors of equal length.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(vectors: &[[f32; 2]]) -> VectorIndex {
        let vectors: Vec<Vec<f32>> = vectors.iter().map(|v| v.to_vec()).collect();
        VectorIndex::build(&vectors).unwrap()
    }

    #[test]
    fn test_squared_euclidean() {
        assert_eq!(squared_euclidean(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_euclidean(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_result_count_is_min_k_n() {
        let index = index_of(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [3.0, 0.0]]);
        let query = vec![vec![0.5, 0.0]];

        for k in 0..8 {
            let results = index.search(&query, k).unwrap();
            assert_eq!(results[0].len(), k.min(4), "k = {}", k);
            assert!(results[0]
                .windows(2)
                .all(|w| w[0].distance <= w[1].distance));
        }
    }

    #[test]
    fn test_nearest_first() {
        let index = index_of(&[[10.0, 10.0], [1.0, 1.0], [0.0, 0.0]]);
        let results = index.search(&[vec![0.1, 0.1]], 2).unwrap();
        let ordinals: Vec<usize> = results[0].iter().map(|n| n.ordinal).collect();
        assert_eq!(ordinals, vec![2, 1]);
    }

    #[test]
    fn test_ties_broken_by_ordinal() {
        // Four points equidistant from the origin.
        let index = index_of(&[[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]]);
        let results = index.search(&[vec![0.0, 0.0]], 3).unwrap();
        let ordinals: Vec<usize> = results[0].iter().map(|n| n.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);

        // Duplicate vectors keep corpus order too.
        let index = index_of(&[[5.0, 5.0], [1.0, 1.0], [1.0, 1.0], [1.0, 1.0]]);
        let results = index.search(&[vec![1.0, 1.0]], 2).unwrap();
        let ordinals: Vec<usize> = results[0].iter().map(|n| n.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), 0);
        // Any query shape is fine against an empty index.
        let results = index.search(&[vec![1.0, 2.0, 3.0]], 5).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_empty());
    }

    #[test]
    fn test_multiple_queries() {
        let index = index_of(&[[0.0, 0.0], [10.0, 10.0]]);
        let results = index
            .search(&[vec![0.0, 0.0], vec![9.0, 9.0]], 1)
            .unwrap();
        assert_eq!(results[0][0].ordinal, 0);
        assert_eq!(results[1][0].ordinal, 1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = VectorIndex::build(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, AuroraError::Index(_)));

        let index = index_of(&[[0.0, 0.0]]);
        assert!(index.search(&[vec![1.0, 2.0, 3.0]], 1).is_err());
    }
}
