//! Tile, Corner and Border records
//!
//! The topology is the dual of the mesh: every mesh node becomes a
//! [`Tile`], every face a [`Corner`] and every edge a [`Border`]. All
//! relations are indices into the arrays owned by
//! [`Topology`](super::Topology).

use glam::Vec3;
use parry3d::bounding_volume::BoundingSphere;
use parry3d::math::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::terrain::Biome;

/// A polygonal region of the surface, centred on a mesh node
///
/// `corners` run in boundary order; `borders[k]` joins `corners[k]` and
/// `corners[k + 1]` (wrapping), and `tiles[k]` is the neighbour across
/// `borders[k]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: usize,
    /// Centre on the planet surface (node position times radius)
    pub position: Vec3,
    /// Outward unit normal
    pub normal: Vec3,
    pub corners: Vec<usize>,
    pub borders: Vec<usize>,
    pub tiles: Vec<usize>,
    /// Spherical area of the polygon
    pub area: f32,
    /// Mean elevation of the tile's corners
    pub elevation: f32,
    pub temperature: f32,
    pub humidity: f32,
    /// Owning tectonic plate, once plates are assigned
    pub plate: Option<usize>,
    /// Biome, once the climate has been simulated
    pub biome: Option<Biome>,
    /// Centre of the tile's bounding sphere (average of its corners)
    pub bounds_center: Vec3,
    /// Radius of the tile's bounding sphere
    pub bounds_radius: f32,
}

impl Tile {
    /// Bounding sphere enclosing every corner of the tile
    pub fn bounding_sphere(&self) -> BoundingSphere {
        let c = self.bounds_center;
        BoundingSphere::new(Point::new(c.x, c.y, c.z), self.bounds_radius)
    }

    /// Great-circle distance between the centres of two tiles
    pub fn distance_to(&self, other: &Tile) -> f32 {
        let radius = self.position.length();
        radius * self.normal.dot(other.normal).clamp(-1.0, 1.0).acos()
    }

    /// Whether the tile is above sea level
    #[inline]
    pub fn is_land(&self) -> bool {
        self.elevation > 0.0
    }

    /// Number of sides (5, 6 or 7)
    #[inline]
    pub fn sides(&self) -> usize {
        self.corners.len()
    }
}

/// Heat carried by a corner during diffusion
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeatState {
    /// Heat absorbed so far
    pub current: f32,
    /// Maximum absorbed per round
    pub absorption: f32,
    /// Saturation level
    pub limit: f32,
    /// Heat held in the air above the corner
    pub air: f32,
    /// Heat arriving for the next round
    pub inflow: f32,
}

/// Moisture carried by a corner during diffusion
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoistureState {
    /// Moisture held in the air above the corner
    pub air: f32,
    /// Moisture arriving for the next round
    pub inflow: f32,
    /// Moisture deposited so far
    pub precipitation: f32,
    /// Maximum deposited per round
    pub rate: f32,
    /// Saturation level
    pub limit: f32,
}

/// A vertex of the tile polygons, centred on a mesh face
///
/// `borders[j]` is the border that does not touch `tiles[j]`, and
/// `corners[j]` is the corner across `borders[j]`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Corner {
    pub id: usize,
    /// Position on the planet surface (face centroid times radius)
    pub position: Vec3,
    pub tiles: [usize; 3],
    pub borders: [usize; 3],
    pub corners: [usize; 3],
    /// Share of the surrounding tiles' area
    pub area: f32,
    pub elevation: f32,
    pub distance_to_plate_boundary: f32,
    pub distance_to_plate_root: f32,
    /// Compression (positive) or tension (negative) across a plate boundary
    pub pressure: f32,
    /// Sliding stress along a plate boundary
    pub shear: f32,
    pub between_plates: bool,
    pub air_current: Vec3,
    pub air_current_speed: f32,
    /// Fraction of outgoing air sent toward each of `corners`
    pub air_outflows: [f32; 3],
    pub water_current: Vec3,
    pub water_current_speed: f32,
    /// Fraction of outgoing water sent toward each of `corners`
    pub water_outflows: [f32; 3],
    pub heat: HeatState,
    pub moisture: MoistureState,
    pub temperature: f32,
    pub humidity: f32,
}

impl Corner {
    /// Whether the corner is above sea level
    #[inline]
    pub fn is_land(&self) -> bool {
        self.elevation > 0.0
    }

    /// Slot of `border` in this corner's border list
    pub fn border_slot(&self, border: usize) -> Option<usize> {
        self.borders.iter().position(|&b| b == border)
    }
}

/// The boundary segment between two tiles, joining two corners
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Border {
    pub id: usize,
    /// End corners, in the boundary order of `tiles[0]`
    pub corners: [usize; 2],
    /// Tiles on either side
    pub tiles: [usize; 2],
    /// The four borders sharing a corner with this one
    pub borders: [usize; 4],
    pub midpoint: Vec3,
    pub length: f32,
    pub between_plates: bool,
}

impl Border {
    /// The other corner of this border
    pub fn opposite_corner(&self, corner: usize) -> Option<usize> {
        match self.corners {
            [a, b] if a == corner => Some(b),
            [a, b] if b == corner => Some(a),
            _ => None,
        }
    }

    /// The tile on the other side of this border
    pub fn opposite_tile(&self, tile: usize) -> Option<usize> {
        match self.tiles {
            [a, b] if a == tile => Some(b),
            [a, b] if b == tile => Some(a),
            _ => None,
        }
    }
}
