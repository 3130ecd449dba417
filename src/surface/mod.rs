//! Engine-agnostic render data for a planet's tiles

mod colors;

pub use colors::{
    BiomeColorMapper, ElevationColorMapper, PlateColorMapper, TileColor, TileColorMapper,
};

use std::collections::HashSet;

use glam::Vec3;

use crate::topology::Topology;

/// Raw vertex data suitable for any rendering engine
///
/// - Bevy: convert to `Mesh` with attributes
/// - Godot: convert to `ArrayMesh`
/// - wgpu: use directly as vertex buffers
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals (direction from the sphere centre)
    pub normals: Vec<[f32; 3]>,
    /// Vertex colors (RGBA)
    pub colors: Vec<[f32; 4]>,
    /// Triangle indices, counter-clockwise seen from outside
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Generate render data for every tile
///
/// Each tile becomes a triangle fan from its centre to its corners, with
/// one flat color from `color_mapper`.
pub fn generate_surface<C: TileColorMapper>(topology: &Topology, color_mapper: &C) -> MeshData {
    generate_surface_with_visibility(topology, color_mapper, None, [0.0, 0.0, 0.0, 1.0])
}

/// Generate render data with fog of war
///
/// # Arguments
/// * `topology` - Tiles and corners to triangulate
/// * `color_mapper` - Maps visible tiles to colors
/// * `visible_tiles` - Visible tile ids; `None` shows every tile
/// * `hidden_color` - Color for hidden tiles
pub fn generate_surface_with_visibility<C: TileColorMapper>(
    topology: &Topology,
    color_mapper: &C,
    visible_tiles: Option<&[usize]>,
    hidden_color: TileColor,
) -> MeshData {
    let mut mesh = MeshData::default();
    let visible: Option<HashSet<usize>> = visible_tiles.map(|ids| ids.iter().copied().collect());

    for tile in &topology.tiles {
        if tile.corners.len() < 3 {
            continue;
        }
        let is_visible = visible.as_ref().map_or(true, |set| set.contains(&tile.id));
        let color = if is_visible {
            color_mapper.map_color(tile)
        } else {
            hidden_color
        };
        let corners: Vec<Vec3> = tile
            .corners
            .iter()
            .map(|&c| topology.corners[c].position)
            .collect();
        triangulate_tile(tile.position, &corners, color, &mut mesh);
    }

    mesh
}

fn triangulate_tile(center: Vec3, corners: &[Vec3], color: TileColor, mesh: &mut MeshData) {
    let base = mesh.positions.len() as u32;

    for p in std::iter::once(&center).chain(corners) {
        mesh.positions.push(p.to_array());
        mesh.normals.push(p.normalize_or_zero().to_array());
        mesh.colors.push(color);
    }

    let n = corners.len() as u32;
    for i in 0..n {
        mesh.indices.extend([base, base + 1 + i, base + 1 + (i + 1) % n]);
    }
}
