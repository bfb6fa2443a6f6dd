//! Flat nearest-neighbor vector index
//!
//! Exact squared-L2 scan over an in-memory matrix, persisted as a single
//! bincode file. Search returns `(distances, ids)` of length exactly `k`,
//! padding with infinite distance and the -1 sentinel when fewer vectors
//! exist. The query path never mutates the index.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use bioastra_common::errors::{AppError, Result};

use crate::NO_MATCH_ID;

/// Flat exact vector index
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    ids: Vec<i64>,
    /// Row-major matrix, `ids.len() * dimension` values
    vectors: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Append one entry; build-time only
    pub fn add(&mut self, id: i64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.ids.push(id);
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    /// Nearest-neighbor search. Both returned vectors have length exactly
    /// `k`; slots beyond the stored entry count carry infinite distance and
    /// the -1 sentinel id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<f32>, Vec<i64>)> {
        if query.len() != self.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<(f32, i64)> = self
            .ids
            .iter()
            .enumerate()
            .map(|(row, &id)| {
                let start = row * self.dimension;
                let vector = &self.vectors[start..start + self.dimension];
                let distance: f32 = vector
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                (distance, id)
            })
            .collect();

        hits.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);

        let mut distances: Vec<f32> = hits.iter().map(|(d, _)| *d).collect();
        let mut ids: Vec<i64> = hits.iter().map(|(_, id)| *id).collect();
        distances.resize(k, f32::INFINITY);
        ids.resize(k, NO_MATCH_ID);

        Ok((distances, ids))
    }

    /// Persist to a bincode file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| AppError::Index {
            message: format!("Failed to write index: {}", e),
        })
    }

    /// Load from a bincode file, verifying internal consistency
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::Configuration {
                message: format!("index file not found: {}", path.display()),
            });
        }

        let file = File::open(path)?;
        let index: Self =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| AppError::Index {
                message: format!("Failed to read index: {}", e),
            })?;

        if index.vectors.len() != index.ids.len() * index.dimension {
            return Err(AppError::Index {
                message: format!(
                    "index file corrupt: {} values for {} entries of dimension {}",
                    index.vectors.len(),
                    index.ids.len(),
                    index.dimension
                ),
            });
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> VectorIndex {
        let mut index = VectorIndex::new(3);
        index.add(10, &[1.0, 0.0, 0.0]).unwrap();
        index.add(11, &[0.0, 1.0, 0.0]).unwrap();
        index.add(12, &[0.0, 0.0, 1.0]).unwrap();
        index
    }

    #[test]
    fn test_search_orders_by_distance() {
        let index = sample_index();
        let (distances, ids) = index.search(&[0.9, 0.1, 0.0], 3).unwrap();

        assert_eq!(ids, vec![10, 11, 12]);
        assert!(distances[0] < distances[1]);
        assert!(distances[1] <= distances[2]);
    }

    #[test]
    fn test_search_pads_with_sentinel() {
        let index = sample_index();
        let (distances, ids) = index.search(&[1.0, 0.0, 0.0], 5).unwrap();

        assert_eq!(ids.len(), 5);
        assert_eq!(distances.len(), 5);
        assert_eq!(&ids[3..], &[NO_MATCH_ID, NO_MATCH_ID]);
        assert!(distances[3].is_infinite());
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(3);
        let (distances, ids) = index.search(&[0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(ids, vec![NO_MATCH_ID, NO_MATCH_ID]);
        assert!(distances.iter().all(|d| d.is_infinite()));
    }

    #[test]
    fn test_exact_squared_distance() {
        let index = sample_index();
        let (distances, ids) = index.search(&[1.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(ids[0], 10);
        assert_eq!(distances[0], 0.0);

        let (distances, _) = index.search(&[0.0, 0.0, 0.0], 1).unwrap();
        assert_eq!(distances[0], 1.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = sample_index();
        assert!(matches!(
            index.add(13, &[1.0, 2.0]),
            Err(AppError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.bin");

        let index = sample_index();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.dimension(), 3);

        let (_, ids) = loaded.search(&[0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(ids, vec![11]);
    }

    #[test]
    fn test_load_missing_file_is_fatal() {
        let err = VectorIndex::load("/nonexistent/index.bin").unwrap_err();
        assert!(err.is_fatal());
    }
}
