use std::cmp::Ordering;

use docrag_core::error::{Error, Result};
use docrag_core::traits::VectorIndex;
use docrag_core::types::SearchHit;

/// Brute-force index over row-major `f32` vectors of one dimension.
///
/// Search is exact: every stored vector is scored by squared L2 distance and
/// the `k` smallest are returned, ties broken by lower id.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn from_vectors(dim: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        check_dim(dim)?;
        let mut data = Vec::with_capacity(dim * vectors.len());
        for v in vectors {
            if v.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: v.len() });
            }
            data.extend_from_slice(v);
        }
        Ok(Self { dim, data })
    }

    /// Rebuild from a flat row-major buffer, as read back from disk.
    pub fn from_flat(dim: usize, data: Vec<f32>) -> Result<Self> {
        check_dim(dim)?;
        if data.len() % dim != 0 {
            return Err(Error::DimensionMismatch { expected: dim, actual: data.len() });
        }
        Ok(Self { dim, data })
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn vector(&self, i: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dim).nth(i)
    }

    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }
}

fn check_dim(dim: usize) -> Result<()> {
    if dim == 0 {
        return Err(Error::InvalidConfig("index dimension must be positive".into()));
    }
    Ok(())
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn by_distance_then_id(a: &SearchHit, b: &SearchHit) -> Ordering {
    a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index))
}

impl VectorIndex for FlatL2Index {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let mut hits: Vec<SearchHit> = self
            .vectors()
            .enumerate()
            .map(|(index, v)| SearchHit { index, distance: squared_l2(query, v) })
            .collect();
        if k < hits.len() {
            hits.select_nth_unstable_by(k, by_distance_then_id);
            hits.truncate(k);
        }
        hits.sort_by(by_distance_then_id);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FlatL2Index {
        FlatL2Index::from_vectors(2, &[vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 2.0], vec![1.0, 0.0]]).unwrap()
    }

    #[test]
    fn nearest_first_with_stable_ties() {
        let hits = index().search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(ids, vec![1, 3, 0]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[2].distance, 1.0);
    }

    #[test]
    fn small_index_returns_everything_without_padding() {
        let hits = index().search(&[0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn zero_k_returns_nothing() {
        assert!(index().search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn wrong_query_dimension_is_rejected() {
        let err = index().search(&[0.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn wrong_vector_dimension_is_rejected_on_build() {
        assert!(FlatL2Index::from_vectors(3, &[vec![1.0, 2.0]]).is_err());
    }
}
