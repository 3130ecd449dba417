//! Spatial indexing for fast position-to-tile lookups
//!
//! This module is only available with the `spatial-index` feature.

use glam::Vec3;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

use crate::topology::Topology;

/// KD-tree over tile centres
///
/// Query positions are projected onto the planet's sphere first, so points
/// above or below the surface resolve to the tile underneath them.
///
/// - Construction: O(n log n)
/// - Query: O(log n)
#[derive(Clone)]
pub struct SpatialIndex {
    tree: ImmutableKdTree<f32, usize, 3, 32>,
    radius: f32,
}

impl SpatialIndex {
    /// Build the index from a topology's tile centres
    ///
    /// # Example
    ///
    /// ```
    /// use icosphere_planet::*;
    ///
    /// let mut rng = XorShift128::new([1, 2, 3, 4]);
    /// let mesh = build_mesh(3, 0.0, &mut rng).unwrap();
    /// let topology = derive_topology(&mesh, 10.0).unwrap();
    ///
    /// let index = SpatialIndex::new(&topology);
    /// let tile = &topology.tiles[5];
    /// assert_eq!(index.find_nearest(tile.position), 5);
    /// ```
    pub fn new(topology: &Topology) -> Self {
        let points: Vec<[f32; 3]> = topology.tiles.iter().map(|t| t.position.to_array()).collect();
        Self {
            tree: ImmutableKdTree::new_from_slice(&points),
            radius: topology.radius,
        }
    }

    /// Id of the tile whose centre is nearest to `position`
    pub fn find_nearest(&self, position: Vec3) -> usize {
        let on_sphere = position.normalize_or_zero() * self.radius;
        let result = self.tree.nearest_one::<SquaredEuclidean>(&on_sphere.to_array());
        result.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_mesh;
    use crate::random::XorShift128;
    use crate::topology::derive_topology;

    fn topology() -> Topology {
        let mut rng = XorShift128::new([8, 6, 7, 5]);
        let mesh = build_mesh(5, 0.0, &mut rng).unwrap();
        derive_topology(&mesh, 20.0).unwrap()
    }

    #[test]
    fn test_exact_tile_centres() {
        let topology = topology();
        let index = SpatialIndex::new(&topology);
        for tile in &topology.tiles {
            assert_eq!(index.find_nearest(tile.position), tile.id);
        }
    }

    #[test]
    fn test_positions_off_the_surface() {
        let topology = topology();
        let index = SpatialIndex::new(&topology);
        let tile = &topology.tiles[17];
        assert_eq!(index.find_nearest(tile.position * 3.0), 17);
        assert_eq!(index.find_nearest(tile.normal * 0.5), 17);
    }

    #[test]
    fn test_corner_resolves_to_adjacent_tile() {
        let topology = topology();
        let index = SpatialIndex::new(&topology);
        let corner = &topology.corners[0];
        let found = index.find_nearest(corner.position);
        assert!(corner.tiles.contains(&found));
    }
}
