//! Radius queries over boid positions.
//!
//! The index is an R*-tree bulk loaded from a snapshot of positions. It holds no
//! state between simulation steps: the flock builds a fresh one every time it
//! recomputes accelerations, since every boid moves each tick.

use nalgebra::SVector;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{Point, RTree};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    /// An index over zero points has nothing to answer queries with.
    #[error("cannot build a spatial index over zero positions")]
    Empty,
}

/// Coordinates of a boid as stored in the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexPoint<const D: usize>([f64; D]);

impl<const D: usize> From<&SVector<f64, D>> for IndexPoint<D> {
    fn from(v: &SVector<f64, D>) -> Self {
        IndexPoint(std::array::from_fn(|k| v[k]))
    }
}

impl<const D: usize> Point for IndexPoint<D> {
    type Scalar = f64;
    const DIMENSIONS: usize = D;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        IndexPoint(std::array::from_fn(|k| generator(k)))
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        self.0[index]
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        &mut self.0[index]
    }
}

type Entry<const D: usize> = GeomWithData<IndexPoint<D>, usize>;

pub struct SpatialIndex<const D: usize> {
    tree: RTree<Entry<D>>,
}

impl<const D: usize> SpatialIndex<D> {
    /// Bulk load the positions; entry `i` carries boid index `i`.
    pub fn build(positions: &[SVector<f64, D>]) -> Result<Self, IndexError> {
        if positions.is_empty() {
            return Err(IndexError::Empty);
        }
        let entries: Vec<Entry<D>> = positions
            .iter()
            .enumerate()
            .map(|(idx, p)| GeomWithData::new(IndexPoint::from(p), idx))
            .collect();
        Ok(SpatialIndex {
            tree: RTree::bulk_load(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of every boid whose Euclidean distance to `point` is at most `radius`,
    /// in ascending order.
    ///
    /// A boid sitting exactly on `point` is part of the result, so querying with a
    /// boid's own position always returns that boid.
    pub fn within_radius(&self, point: &SVector<f64, D>, radius: f64) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .tree
            .locate_within_distance(IndexPoint::from(point), radius * radius)
            .map(|entry| entry.data)
            .collect();
        found.sort_unstable();
        found
    }

    /// Neighbour list for every indexed boid at once.
    ///
    /// `positions` must be the slice the index was built from. List `i` always
    /// contains `i` itself.
    pub fn neighbours_of_all(
        &self,
        positions: &[SVector<f64, D>],
        radius: f64,
    ) -> Vec<Vec<usize>> {
        positions
            .par_iter()
            .map(|p| self.within_radius(p, radius))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Vector2, Vector3};

    #[test]
    fn empty_positions_are_rejected() {
        let positions: Vec<Vector2<f64>> = Vec::new();
        assert_eq!(SpatialIndex::build(&positions).err(), Some(IndexError::Empty));
    }

    #[test]
    fn point_query_is_inclusive_and_sorted() {
        let positions = vec![
            Vector2::new(3.0, 0.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.5, 0.0),
        ];
        let index = SpatialIndex::build(&positions).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.within_radius(&Vector2::new(0.0, 0.0), 1.0), vec![1, 2]);
        assert!(index.within_radius(&Vector2::new(10.0, 10.0), 1.0).is_empty());
    }

    #[test]
    fn every_list_contains_its_owner() {
        let positions = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.5, 0.0, 0.0),
            Vector3::new(5.0, 5.0, 5.0),
        ];
        let index = SpatialIndex::build(&positions).unwrap();
        let lists = index.neighbours_of_all(&positions, 1.0);
        assert_eq!(lists, vec![vec![0, 1], vec![0, 1], vec![2]]);
    }

    #[test]
    fn matches_brute_force_search() {
        let positions: Vec<Vector2<f64>> = (0..200)
            .map(|i| {
                let t = i as f64 * 0.37;
                Vector2::new((t * 7.1).sin() * 20.0 + 20.0, (t * 3.3).cos() * 20.0 + 20.0)
            })
            .collect();
        let index = SpatialIndex::build(&positions).unwrap();
        let lists = index.neighbours_of_all(&positions, 4.0);
        for (i, list) in lists.iter().enumerate() {
            let expected: Vec<usize> = (0..positions.len())
                .filter(|&j| (positions[i] - positions[j]).norm_squared() <= 16.0)
                .collect();
            assert_eq!(list, &expected);
        }
    }
}
