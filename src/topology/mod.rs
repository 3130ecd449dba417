//! Tile / Corner / Border topology derived from a mesh
//!
//! [`derive_topology`] turns a finished [`MeshGraph`](crate::mesh::MeshGraph)
//! into its dual. The resulting [`Topology`] owns every entity; the terrain
//! stages fill in the per-entity fields afterwards.

mod derive;
mod entities;

pub use derive::derive_topology;
pub use entities::{Border, Corner, HeatState, MoistureState, Tile};

use glam::Vec3;
use parry3d::bounding_volume::{BoundingSphere, BoundingVolume};
use parry3d::math::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Reference to any topology entity
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Tile(usize),
    Corner(usize),
    Border(usize),
}

/// The derived surface topology of a planet
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub radius: f32,
    pub tiles: Vec<Tile>,
    pub corners: Vec<Corner>,
    pub borders: Vec<Border>,
}

impl Topology {
    /// Corners adjacent to an entity
    pub fn corners(&self, entity: Entity) -> &[usize] {
        match entity {
            Entity::Tile(t) => &self.tiles[t].corners,
            Entity::Corner(c) => &self.corners[c].corners,
            Entity::Border(b) => &self.borders[b].corners,
        }
    }

    /// Borders adjacent to an entity
    pub fn borders(&self, entity: Entity) -> &[usize] {
        match entity {
            Entity::Tile(t) => &self.tiles[t].borders,
            Entity::Corner(c) => &self.corners[c].borders,
            Entity::Border(b) => &self.borders[b].borders,
        }
    }

    /// Tiles adjacent to an entity
    pub fn tiles(&self, entity: Entity) -> &[usize] {
        match entity {
            Entity::Tile(t) => &self.tiles[t].tiles,
            Entity::Corner(c) => &self.corners[c].tiles,
            Entity::Border(b) => &self.borders[b].tiles,
        }
    }

    /// The entity of the same kind on the other side of (or at the other
    /// end of) `border`
    ///
    /// For a tile this is the neighbouring tile, for a corner the corner at
    /// the far end of the border. Borders have no opposite.
    pub fn opposite(&self, entity: Entity, border: usize) -> Option<Entity> {
        let border = &self.borders[border];
        match entity {
            Entity::Tile(t) => border.opposite_tile(t).map(Entity::Tile),
            Entity::Corner(c) => border.opposite_corner(c).map(Entity::Corner),
            Entity::Border(_) => None,
        }
    }

    /// The corner across `corner.borders[slot]`
    #[inline]
    pub fn far_corner(&self, corner: usize, slot: usize) -> usize {
        self.corners[corner].corners[slot]
    }

    /// Tiles whose bounding sphere intersects the given sphere
    pub fn tiles_intersecting(&self, center: Vec3, radius: f32) -> Vec<usize> {
        let query = BoundingSphere::new(Point::new(center.x, center.y, center.z), radius);
        self.tiles
            .iter()
            .filter(|tile| tile.bounding_sphere().intersects(&query))
            .map(|tile| tile.id)
            .collect()
    }

    /// Sum of all tile areas
    pub fn total_area(&self) -> f32 {
        self.tiles.iter().map(|tile| tile.area).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_mesh;
    use crate::random::XorShift128;

    fn sample() -> Topology {
        let mut rng = XorShift128::new([1, 1, 2, 3]);
        let mesh = build_mesh(4, 0.1, &mut rng).unwrap();
        derive_topology(&mesh, 100.0).unwrap()
    }

    #[test]
    fn test_entity_queries() {
        let topology = sample();
        assert_eq!(topology.corners(Entity::Tile(0)), topology.tiles[0].corners.as_slice());
        assert_eq!(topology.tiles(Entity::Corner(3)).len(), 3);
        assert_eq!(topology.borders(Entity::Corner(3)).len(), 3);
        assert_eq!(topology.corners(Entity::Border(5)).len(), 2);
        assert_eq!(topology.tiles(Entity::Border(5)).len(), 2);
        assert_eq!(topology.borders(Entity::Border(5)).len(), 4);
    }

    #[test]
    fn test_opposite() {
        let topology = sample();
        for (b, border) in topology.borders.iter().enumerate() {
            assert_eq!(
                topology.opposite(Entity::Tile(border.tiles[0]), b),
                Some(Entity::Tile(border.tiles[1]))
            );
            assert_eq!(
                topology.opposite(Entity::Corner(border.corners[1]), b),
                Some(Entity::Corner(border.corners[0]))
            );
            assert_eq!(topology.opposite(Entity::Border(b), b), None);
        }
    }

    #[test]
    fn test_tiles_intersecting() {
        let topology = sample();
        let target = &topology.tiles[7];
        let hits = topology.tiles_intersecting(target.position, 1.0);
        assert!(hits.contains(&7));
        assert!(hits.len() < topology.tiles.len());

        let everything = topology.tiles_intersecting(Vec3::ZERO, 200.0);
        assert_eq!(everything.len(), topology.tiles.len());
    }
}
