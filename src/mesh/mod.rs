//! Spherical triangle mesh construction
//!
//! Builds the node/edge/face graph the planet topology is derived from:
//! an icosahedron is subdivided, randomly distorted by edge rotations and
//! relaxed toward uniform triangle density.
//!
//! All relations are stored as indices into the graph's flat arrays.

mod distort;
mod icosahedron;
mod relax;
mod subdivide;

pub use distort::{distort_mesh, DistortionReport};
pub use icosahedron::icosahedron;
pub use relax::{relax_mesh, relax_until_converged, RelaxOptions};
pub use subdivide::subdivide;

use std::collections::HashMap;

use glam::Vec3;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PlanetError, Result};
use crate::util::{Stage, StageTimer};

/// Number of distortion rounds, each followed by a relaxation pass
const DISTORTION_ROUNDS: usize = 6;

/// A mesh vertex on the unit sphere
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Position on the unit sphere
    pub position: Vec3,
    /// Incident edge indices
    pub edges: Vec<usize>,
    /// Incident face indices (cyclic order once the mesh is finished)
    pub faces: Vec<usize>,
}

/// A mesh edge joining two nodes and separating two faces
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// The two end nodes
    pub nodes: [usize; 2],
    /// The two faces on either side
    pub faces: [usize; 2],
}

impl Edge {
    /// The face on the other side of this edge, if `face` borders it
    pub fn opposite_face(&self, face: usize) -> Option<usize> {
        if self.faces[0] == face {
            Some(self.faces[1])
        } else if self.faces[1] == face {
            Some(self.faces[0])
        } else {
            None
        }
    }

    /// The other end of this edge, if `node` is one of its ends
    pub fn opposite_node(&self, node: usize) -> Option<usize> {
        if self.nodes[0] == node {
            Some(self.nodes[1])
        } else if self.nodes[1] == node {
            Some(self.nodes[0])
        } else {
            None
        }
    }
}

/// A triangular face
///
/// `edges[i]` is always the edge that does not touch `nodes[i]`.
/// Faces are wound counter-clockwise when seen from outside the sphere.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Corner nodes
    pub nodes: [usize; 3],
    /// Edges, `edges[i]` opposite `nodes[i]`
    pub edges: [usize; 3],
    /// Normalized centroid
    pub centroid: Vec3,
}

/// The node/edge/face graph of a spherical triangle mesh
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub faces: Vec<Face>,
}

impl MeshGraph {
    /// Build a mesh from node positions and counter-clockwise triangles
    ///
    /// Edges are created in first-seen order while walking the triangles,
    /// so the result is fully determined by the input order.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInvariantBroken` if any edge is not shared by
    /// exactly two triangles (the surface is not closed).
    pub fn from_triangles(positions: Vec<Vec3>, triangles: &[[usize; 3]]) -> Result<Self> {
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::with_capacity(triangles.len() * 3 / 2);
        let mut edge_nodes: Vec<[usize; 2]> = Vec::with_capacity(triangles.len() * 3 / 2);
        let mut edge_faces: Vec<Vec<usize>> = Vec::with_capacity(triangles.len() * 3 / 2);
        let mut faces = Vec::with_capacity(triangles.len());

        for (face_idx, triangle) in triangles.iter().enumerate() {
            if let Some(&bad) = triangle.iter().find(|&&n| n >= positions.len()) {
                return Err(PlanetError::StructuralInvariantBroken(format!(
                    "face {} references missing node {}",
                    face_idx, bad
                )));
            }

            let mut edges = [0usize; 3];
            for (slot, edge_slot) in edges.iter_mut().enumerate() {
                let a = triangle[(slot + 1) % 3];
                let b = triangle[(slot + 2) % 3];
                let key = (a.min(b), a.max(b));
                let edge_idx = match lookup.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let idx = edge_nodes.len();
                        edge_nodes.push([a, b]);
                        edge_faces.push(Vec::with_capacity(2));
                        lookup.insert(key, idx);
                        idx
                    }
                };
                edge_faces[edge_idx].push(face_idx);
                *edge_slot = edge_idx;
            }

            faces.push(Face {
                nodes: *triangle,
                edges,
                centroid: triangle_centroid(
                    positions[triangle[0]],
                    positions[triangle[1]],
                    positions[triangle[2]],
                ),
            });
        }

        let mut edges = Vec::with_capacity(edge_nodes.len());
        for (edge_idx, (nodes, incident)) in edge_nodes.into_iter().zip(edge_faces).enumerate() {
            if incident.len() != 2 {
                return Err(PlanetError::StructuralInvariantBroken(format!(
                    "edge {} ({} - {}) borders {} faces instead of 2",
                    edge_idx,
                    nodes[0],
                    nodes[1],
                    incident.len()
                )));
            }
            edges.push(Edge {
                nodes,
                faces: [incident[0], incident[1]],
            });
        }

        let mut nodes: Vec<Node> = positions
            .into_iter()
            .map(|position| Node {
                position,
                edges: Vec::with_capacity(6),
                faces: Vec::with_capacity(6),
            })
            .collect();

        for (edge_idx, edge) in edges.iter().enumerate() {
            nodes[edge.nodes[0]].edges.push(edge_idx);
            nodes[edge.nodes[1]].edges.push(edge_idx);
        }
        for (face_idx, face) in faces.iter().enumerate() {
            for &node in &face.nodes {
                nodes[node].faces.push(face_idx);
            }
        }

        Ok(Self { nodes, edges, faces })
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// V - E + F, which is 2 for any closed genus-0 mesh
    pub fn euler_characteristic(&self) -> i64 {
        self.nodes.len() as i64 - self.edges.len() as i64 + self.faces.len() as i64
    }

    /// Number of faces around a node
    #[inline]
    pub fn valence(&self, node: usize) -> usize {
        self.nodes[node].faces.len()
    }

    /// Recompute every face centroid from the current node positions
    pub fn recompute_centroids(&mut self) {
        let nodes = &self.nodes;
        for face in &mut self.faces {
            face.centroid = triangle_centroid(
                nodes[face.nodes[0]].position,
                nodes[face.nodes[1]].position,
                nodes[face.nodes[2]].position,
            );
        }
    }

    /// The face following `face` counter-clockwise around `node`
    ///
    /// Walks across the edge joining `node` to the face's previous corner.
    pub fn next_face_around(&self, node: usize, face: usize) -> Option<usize> {
        let face_ref = &self.faces[face];
        let slot = face_ref.nodes.iter().position(|&n| n == node)?;
        let edge = &self.edges[face_ref.edges[(slot + 1) % 3]];
        edge.opposite_face(face)
    }

    /// Reorder each node's face list into cyclic (boundary) order
    ///
    /// Incremental construction and edge rotation leave the lists in
    /// insertion order; the topology needs them in walking order.
    ///
    /// # Errors
    ///
    /// Returns `StructuralInvariantBroken` if the walk around a node leaves
    /// its fan of faces.
    pub fn sort_node_faces(&mut self) -> Result<()> {
        for node_idx in 0..self.nodes.len() {
            let mut faces = std::mem::take(&mut self.nodes[node_idx].faces);
            for j in 1..faces.len().saturating_sub(1) {
                let next = self
                    .next_face_around(node_idx, faces[j - 1])
                    .and_then(|next| faces.iter().position(|&f| f == next).map(|k| (next, k)));
                match next {
                    Some((_, k)) if k >= j => faces.swap(j, k),
                    _ => {
                        return Err(PlanetError::StructuralInvariantBroken(format!(
                            "faces around node {} do not form a closed fan",
                            node_idx
                        )))
                    }
                }
            }
            self.nodes[node_idx].faces = faces;
        }
        Ok(())
    }
}

/// Normalized centroid of a spherical triangle
#[inline]
pub(crate) fn triangle_centroid(p0: Vec3, p1: Vec3, p2: Vec3) -> Vec3 {
    ((p0 + p1 + p2) / 3.0).normalize_or_zero()
}

/// Build a subdivided, distorted and relaxed icosphere
///
/// Uses the default [`RelaxOptions`]. See [`build_mesh_with_options`].
///
/// # Example
///
/// ```
/// use icosphere_planet::{build_mesh, XorShift128};
///
/// let mut rng = XorShift128::new([1, 2, 3, 4]);
/// let mesh = build_mesh(4, 0.1, &mut rng).unwrap();
/// assert_eq!(mesh.face_count(), 20 * 4 * 4);
/// ```
pub fn build_mesh<R: Rng>(degree: usize, distortion: f32, rng: &mut R) -> Result<MeshGraph> {
    build_mesh_with_options(degree, distortion, RelaxOptions::default(), rng)
}

/// Build an icosphere mesh with custom relaxation options
///
/// # Arguments
///
/// * `degree` - Number of segments each icosahedron edge is split into (>= 1)
/// * `distortion` - Fraction of edges to rotate, in `[0, 1]`
/// * `options` - Relaxation multiplier and convergence settings
/// * `rng` - Random stream; only the distortion step draws from it
///
/// # Errors
///
/// Returns `DegenerateInput` for a zero degree or a distortion outside
/// `[0, 1]`, and `StructuralInvariantBroken` if the mesh loses consistency.
pub fn build_mesh_with_options<R: Rng>(
    degree: usize,
    distortion: f32,
    options: RelaxOptions,
    rng: &mut R,
) -> Result<MeshGraph> {
    if degree < 1 {
        return Err(PlanetError::DegenerateInput(format!(
            "subdivision degree must be >= 1 (got {})",
            degree
        )));
    }
    if !(0.0..=1.0).contains(&distortion) {
        return Err(PlanetError::DegenerateInput(format!(
            "distortion must be within [0, 1] (got {})",
            distortion
        )));
    }

    let _t = StageTimer::start(Stage::Mesh);

    let mut mesh = subdivide(&icosahedron()?, degree)?;
    log::debug!(
        "Subdivided icosahedron to degree {}: {} nodes, {} edges, {} faces",
        degree,
        mesh.node_count(),
        mesh.edge_count(),
        mesh.face_count()
    );

    let mut remaining = (mesh.edge_count() as f64 * f64::from(distortion)).ceil() as usize;
    for rounds_left in (1..=DISTORTION_ROUNDS).rev() {
        let flips = remaining / rounds_left;
        remaining -= flips;
        let report = distort_mesh(&mut mesh, flips, rng)?;
        log::debug!(
            "Distortion round {}: {} of {} flips performed",
            DISTORTION_ROUNDS - rounds_left + 1,
            report.performed,
            report.requested
        );
        relax_mesh(&mut mesh, options.multiplier);
    }

    relax_until_converged(&mut mesh, options);

    mesh.recompute_centroids();
    mesh.sort_node_faces()?;

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::XorShift128;

    fn assert_counts(mesh: &MeshGraph, degree: usize) {
        let d2 = degree * degree;
        assert_eq!(mesh.face_count(), 20 * d2);
        assert_eq!(mesh.edge_count(), 30 * d2);
        assert_eq!(mesh.node_count(), 10 * d2 + 2);
        assert_eq!(mesh.euler_characteristic(), 2);
    }

    #[test]
    fn test_build_mesh_counts() {
        for degree in [1, 2, 3, 5] {
            let mut rng = XorShift128::new([11, 22, 33, 44]);
            let mesh = build_mesh(degree, 0.0, &mut rng).unwrap();
            assert_counts(&mesh, degree);
        }
    }

    #[test]
    fn test_build_mesh_rejects_degenerate_input() {
        let mut rng = XorShift128::default();
        assert!(matches!(
            build_mesh(0, 0.0, &mut rng),
            Err(PlanetError::DegenerateInput(_))
        ));
        assert!(build_mesh(2, 1.5, &mut rng).is_err());
        assert!(build_mesh(2, -0.1, &mut rng).is_err());
    }

    #[test]
    fn test_nodes_stay_on_unit_sphere() {
        let mut rng = XorShift128::new([5, 6, 7, 8]);
        let mesh = build_mesh(6, 0.2, &mut rng).unwrap();
        for node in &mesh.nodes {
            assert!((node.position.length() - 1.0).abs() < 1e-4);
        }
        for face in &mesh.faces {
            assert!((face.centroid.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_undistorted_valences() {
        let mut rng = XorShift128::default();
        let mesh = build_mesh(4, 0.0, &mut rng).unwrap();
        let fives = (0..mesh.node_count()).filter(|&n| mesh.valence(n) == 5).count();
        let sixes = (0..mesh.node_count()).filter(|&n| mesh.valence(n) == 6).count();
        assert_eq!(fives, 12);
        assert_eq!(fives + sixes, mesh.node_count());
    }

    #[test]
    fn test_distorted_valence_bounds() {
        let mut rng = XorShift128::new([99, 98, 97, 96]);
        let mesh = build_mesh(8, 0.2, &mut rng).unwrap();
        assert_counts(&mesh, 8);
        for node in 0..mesh.node_count() {
            let valence = mesh.valence(node);
            assert!((5..=7).contains(&valence), "node {} has valence {}", node, valence);
        }
    }

    #[test]
    fn test_node_faces_are_cyclic() {
        let mut rng = XorShift128::new([3, 1, 4, 1]);
        let mesh = build_mesh(5, 0.15, &mut rng).unwrap();
        for (node_idx, node) in mesh.nodes.iter().enumerate() {
            let n = node.faces.len();
            for k in 0..n {
                let next = mesh.next_face_around(node_idx, node.faces[k]).unwrap();
                assert_eq!(next, node.faces[(k + 1) % n]);
            }
        }
    }

    #[test]
    fn test_face_edge_convention() {
        let mut rng = XorShift128::new([8, 6, 7, 5]);
        let mesh = build_mesh(4, 0.1, &mut rng).unwrap();
        for face in &mesh.faces {
            for i in 0..3 {
                let edge = &mesh.edges[face.edges[i]];
                assert!(!edge.nodes.contains(&face.nodes[i]));
                assert!(edge.nodes.contains(&face.nodes[(i + 1) % 3]));
                assert!(edge.nodes.contains(&face.nodes[(i + 2) % 3]));
            }
        }
    }

    #[test]
    fn test_build_mesh_determinism() {
        let mut rng1 = XorShift128::new([1, 2, 3, 4]);
        let mut rng2 = XorShift128::new([1, 2, 3, 4]);
        let mesh1 = build_mesh(5, 0.1, &mut rng1).unwrap();
        let mesh2 = build_mesh(5, 0.1, &mut rng2).unwrap();
        assert_eq!(mesh1, mesh2);
    }

    #[test]
    fn test_from_triangles_rejects_open_surface() {
        let positions = vec![Vec3::X, Vec3::Y, Vec3::Z];
        let result = MeshGraph::from_triangles(positions, &[[0, 1, 2]]);
        assert!(matches!(result, Err(PlanetError::StructuralInvariantBroken(_))));
    }
}
