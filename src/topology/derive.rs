//! Mesh to topology conversion

use glam::Vec3;

use super::{Border, Corner, Tile, Topology};
use crate::error::{PlanetError, Result};
use crate::mesh::MeshGraph;
use crate::util::{Stage, StageTimer};

/// Derive the tile / corner / border topology of `mesh` at `radius`
///
/// Node face lists must already be in cyclic order (as left by
/// [`build_mesh`](crate::mesh::build_mesh)). The mesh is not modified.
///
/// # Errors
///
/// `DegenerateInput` for a non-positive or non-finite radius.
/// `StructuralInvariantBroken` if a tile's borders cannot be matched to
/// consecutive pairs of its corners, or corner adjacency is inconsistent.
///
/// # Example
///
/// ```
/// use icosphere_planet::{build_mesh, derive_topology, XorShift128};
///
/// let mut rng = XorShift128::new([1, 2, 3, 4]);
/// let mesh = build_mesh(3, 0.0, &mut rng).unwrap();
/// let topology = derive_topology(&mesh, 1000.0).unwrap();
/// assert_eq!(topology.tiles.len(), mesh.node_count());
/// assert_eq!(topology.corners.len(), mesh.face_count());
/// ```
pub fn derive_topology(mesh: &MeshGraph, radius: f32) -> Result<Topology> {
    if !(radius.is_finite() && radius > 0.0) {
        return Err(PlanetError::DegenerateInput(format!(
            "radius must be positive and finite (got {})",
            radius
        )));
    }
    let _t = StageTimer::start(Stage::Topology);

    let mut corners = build_corners(mesh, radius)?;
    let mut borders = build_borders(mesh, &corners);
    let mut tiles = build_tiles(mesh, radius, &corners, &mut borders)?;

    for border in &mut borders {
        let [c0, c1] = border.corners;
        border.midpoint = (corners[c0].position + corners[c1].position) * 0.5;
        border.length = corners[c0].position.distance(corners[c1].position);
    }

    for tile in &mut tiles {
        tile.area = tile
            .borders
            .iter()
            .map(|&b| {
                let [c0, c1] = borders[b].corners;
                spherical_triangle_area(tile.position, corners[c0].position, corners[c1].position)
            })
            .sum::<f32>()
            * radius
            * radius;

        let center = tile
            .corners
            .iter()
            .map(|&c| corners[c].position)
            .sum::<Vec3>()
            / tile.corners.len() as f32;
        tile.bounds_center = center;
        tile.bounds_radius = tile
            .corners
            .iter()
            .map(|&c| center.distance(corners[c].position))
            .fold(0.0, f32::max);
    }

    for corner in &mut corners {
        corner.area = corner
            .tiles
            .iter()
            .map(|&t| tiles[t].area / tiles[t].corners.len() as f32)
            .sum();
    }

    Ok(Topology {
        radius,
        tiles,
        corners,
        borders,
    })
}

fn build_corners(mesh: &MeshGraph, radius: f32) -> Result<Vec<Corner>> {
    mesh.faces
        .iter()
        .enumerate()
        .map(|(id, face)| {
            let mut far = [0usize; 3];
            for (slot, &edge) in face.edges.iter().enumerate() {
                far[slot] = mesh.edges[edge].opposite_face(id).ok_or_else(|| {
                    PlanetError::StructuralInvariantBroken(format!(
                        "edge {} is listed by face {} but does not border it",
                        edge, id
                    ))
                })?;
            }
            Ok(Corner {
                id,
                position: face.centroid * radius,
                tiles: face.nodes,
                borders: face.edges,
                corners: far,
                ..Default::default()
            })
        })
        .collect()
}

fn build_borders(mesh: &MeshGraph, corners: &[Corner]) -> Vec<Border> {
    mesh.edges
        .iter()
        .enumerate()
        .map(|(id, edge)| {
            let mut adjacent = [0usize; 4];
            let mut n = 0;
            for &corner in &edge.faces {
                for &other in &corners[corner].borders {
                    if other != id && n < 4 {
                        adjacent[n] = other;
                        n += 1;
                    }
                }
            }
            Border {
                id,
                corners: edge.faces,
                tiles: edge.nodes,
                borders: adjacent,
                ..Default::default()
            }
        })
        .collect()
}

/// Build tiles and canonicalise border corner order along the way
fn build_tiles(
    mesh: &MeshGraph,
    radius: f32,
    corners: &[Corner],
    borders: &mut [Border],
) -> Result<Vec<Tile>> {
    let mut tiles = Vec::with_capacity(mesh.nodes.len());
    for (id, node) in mesh.nodes.iter().enumerate() {
        let tile_corners = node.faces.clone();
        let n = tile_corners.len();
        let mut tile_borders = Vec::with_capacity(n);
        let mut neighbours = Vec::with_capacity(n);

        for k in 0..n {
            let (ck, cnext) = (tile_corners[k], tile_corners[(k + 1) % n]);
            let border_idx = node
                .edges
                .iter()
                .copied()
                .find(|&e| {
                    let [a, b] = borders[e].corners;
                    (a == ck && b == cnext) || (a == cnext && b == ck)
                })
                .ok_or_else(|| {
                    PlanetError::StructuralInvariantBroken(format!(
                        "tile {} has no border between corners {} and {}",
                        id, ck, cnext
                    ))
                })?;

            let border = &mut borders[border_idx];
            border.corners = if border.tiles[0] == id { [ck, cnext] } else { [cnext, ck] };
            let neighbour = border.opposite_tile(id).ok_or_else(|| {
                PlanetError::StructuralInvariantBroken(format!(
                    "border {} does not touch tile {}",
                    border_idx, id
                ))
            })?;
            tile_borders.push(border_idx);
            neighbours.push(neighbour);
        }

        debug_assert!(tile_corners.iter().all(|&c| corners[c].tiles.contains(&id)));

        let normal = node.position.normalize_or_zero();
        tiles.push(Tile {
            id,
            position: node.position * radius,
            normal,
            corners: tile_corners,
            borders: tile_borders,
            tiles: neighbours,
            area: 0.0,
            elevation: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            plate: None,
            biome: None,
            bounds_center: Vec3::ZERO,
            bounds_radius: 0.0,
        });
    }
    Ok(tiles)
}

/// Area of the unit-sphere triangle spanned by the directions of `a`, `b`, `c`
///
/// Spherical excess via the Van Oosterom-Strackee formula, so fans sharing
/// great-circle edges partition the sphere exactly.
#[inline]
fn spherical_triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let (a, b, c) = (a.normalize_or_zero(), b.normalize_or_zero(), c.normalize_or_zero());
    let triple = a.dot(b.cross(c)).abs();
    let denominator = 1.0 + a.dot(b) + b.dot(c) + c.dot(a);
    2.0 * triple.atan2(denominator)
}
