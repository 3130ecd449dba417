//! Random edge rotation ("distortion")
//!
//! Rotating an edge replaces the diagonal of the quad formed by its two
//! faces with the other diagonal. Applied randomly it breaks up the regular
//! subdivision pattern while keeping every node at 5 to 7 faces.

use rand::Rng;

use super::MeshGraph;
use crate::error::{PlanetError, Result};

/// Nodes may not end up with more faces than this
const MAX_VALENCE: usize = 7;
/// Nodes may not end up with fewer faces than this
const MIN_VALENCE: usize = 5;
/// Minimum cosine between the old edge and each new triangle side
const MIN_ROTATION_COSINE: f32 = 0.2;

/// Outcome of a distortion pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistortionReport {
    /// Flips asked for
    pub requested: usize,
    /// Flips actually performed
    pub performed: usize,
    /// Flips abandoned after a full edge scan found no rotatable edge
    pub skipped: usize,
}

/// Perform `flips` random edge rotations
///
/// Each flip starts at a random edge and walks forward (wrapping) until an
/// edge passes the rotation predicate. A flip that scans every edge without
/// success is skipped; since the mesh is unchanged, every later flip in the
/// pass would fail the same way, so those only consume their random draw.
///
/// # Errors
///
/// Returns `StructuralInvariantBroken` if an edge and its faces disagree.
pub fn distort_mesh<R: Rng>(mesh: &mut MeshGraph, flips: usize, rng: &mut R) -> Result<DistortionReport> {
    let mut report = DistortionReport {
        requested: flips,
        ..Default::default()
    };
    let edge_count = mesh.edge_count();
    if edge_count == 0 {
        report.skipped = flips;
        return Ok(report);
    }

    let mut stalled = false;
    for _ in 0..flips {
        let mut edge = rng.gen_range(0..edge_count);
        if stalled {
            report.skipped += 1;
            continue;
        }

        let mut attempts = 0;
        loop {
            match rotate_edge(mesh, edge) {
                Ok(()) => {
                    report.performed += 1;
                    break;
                }
                Err(PlanetError::ConstraintViolation { .. }) => {
                    attempts += 1;
                    if attempts >= edge_count {
                        log::debug!("No rotatable edge left, skipping remaining flips");
                        report.skipped += 1;
                        stalled = true;
                        break;
                    }
                    edge = (edge + 1) % edge_count;
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(report)
}

/// Rotate `edge_index` to join the two apex nodes of its faces
///
/// With faces `(c0, p, q)` and `(c1, q, p)` sharing edge `p-q`, the result
/// is faces `(c0, p, c1)` and `(c1, q, c0)` sharing edge `c0-c1`. Face
/// slots of the far nodes are kept, so the opposite-edge convention holds.
///
/// # Errors
///
/// `ConstraintViolation` if the rotation predicate refuses the edge,
/// `StructuralInvariantBroken` if the faces do not contain the edge or are
/// wound inconsistently.
pub(crate) fn rotate_edge(mesh: &mut MeshGraph, edge_index: usize) -> Result<()> {
    let [f0, f1] = mesh.edges[edge_index].faces;
    let k0 = far_slot(mesh, f0, edge_index)?;
    let k1 = far_slot(mesh, f1, edge_index)?;

    let face0 = &mesh.faces[f0];
    let face1 = &mesh.faces[f1];
    let c0 = face0.nodes[k0];
    let p = face0.nodes[(k0 + 1) % 3];
    let q = face0.nodes[(k0 + 2) % 3];
    let c1 = face1.nodes[k1];
    if face1.nodes[(k1 + 1) % 3] != q || face1.nodes[(k1 + 2) % 3] != p {
        return Err(PlanetError::StructuralInvariantBroken(format!(
            "faces {} and {} around edge {} are wound inconsistently",
            f0, f1, edge_index
        )));
    }

    // q-c0 leaves face 0 for face 1, p-c1 leaves face 1 for face 0
    let edge_q_c0 = face0.edges[(k0 + 1) % 3];
    let edge_p_c1 = face1.edges[(k1 + 1) % 3];

    check_rotation(mesh, p, q, c0, c1).map_err(|reason| PlanetError::ConstraintViolation {
        edge: edge_index,
        reason,
    })?;

    remove_item(&mut mesh.nodes[p].edges, edge_index);
    remove_item(&mut mesh.nodes[q].edges, edge_index);
    mesh.nodes[c0].edges.push(edge_index);
    mesh.nodes[c1].edges.push(edge_index);

    remove_item(&mut mesh.nodes[p].faces, f1);
    remove_item(&mut mesh.nodes[q].faces, f0);
    mesh.nodes[c0].faces.push(f1);
    mesh.nodes[c1].faces.push(f0);

    replace_item(&mut mesh.edges[edge_p_c1].faces, f1, f0);
    replace_item(&mut mesh.edges[edge_q_c0].faces, f0, f1);
    mesh.edges[edge_index].nodes = [c0, c1];

    let face0 = &mut mesh.faces[f0];
    face0.nodes[(k0 + 2) % 3] = c1;
    face0.edges[k0] = edge_p_c1;
    face0.edges[(k0 + 1) % 3] = edge_index;

    let face1 = &mut mesh.faces[f1];
    face1.nodes[(k1 + 2) % 3] = c0;
    face1.edges[k1] = edge_q_c0;
    face1.edges[(k1 + 1) % 3] = edge_index;

    Ok(())
}

/// Slot of the node opposite `edge` in `face`
fn far_slot(mesh: &MeshGraph, face: usize, edge: usize) -> Result<usize> {
    mesh.faces[face]
        .edges
        .iter()
        .position(|&e| e == edge)
        .ok_or_else(|| {
            PlanetError::StructuralInvariantBroken(format!("face {} does not contain edge {}", face, edge))
        })
}

/// Geometric and valence test for rotating edge `old0-old1` to `new0-new1`
fn check_rotation(
    mesh: &MeshGraph,
    old0: usize,
    old1: usize,
    new0: usize,
    new1: usize,
) -> std::result::Result<(), &'static str> {
    if new0 == new1 {
        return Err("apex nodes coincide");
    }
    if mesh.valence(new0) >= MAX_VALENCE || mesh.valence(new1) >= MAX_VALENCE {
        return Err("apex valence too high");
    }
    if mesh.valence(old0) <= MIN_VALENCE || mesh.valence(old1) <= MIN_VALENCE {
        return Err("endpoint valence too low");
    }
    let already_joined = mesh.nodes[new0]
        .edges
        .iter()
        .any(|&e| mesh.edges[e].opposite_node(new0) == Some(new1));
    if already_joined {
        return Err("apex nodes already joined");
    }

    let p_old0 = mesh.nodes[old0].position;
    let p_old1 = mesh.nodes[old1].position;
    let p_new0 = mesh.nodes[new0].position;
    let p_new1 = mesh.nodes[new1].position;

    let old_length = p_old0.distance(p_old1);
    let new_length = p_new0.distance(p_new1);
    let ratio = old_length / new_length;
    if !(ratio > 0.5 && ratio < 2.0) {
        return Err("edge length ratio out of range");
    }

    let along = (p_old1 - p_old0) / old_length;
    let to_new0 = (p_new0 - p_old0).normalize_or_zero();
    let to_new1 = (p_new1 - p_old0).normalize_or_zero();
    if along.dot(to_new0) < MIN_ROTATION_COSINE || along.dot(to_new1) < MIN_ROTATION_COSINE {
        return Err("rotation too sharp");
    }

    let back = -along;
    let to_new0 = (p_new0 - p_old1).normalize_or_zero();
    let to_new1 = (p_new1 - p_old1).normalize_or_zero();
    if back.dot(to_new0) < MIN_ROTATION_COSINE || back.dot(to_new1) < MIN_ROTATION_COSINE {
        return Err("rotation too sharp");
    }

    Ok(())
}

fn remove_item(list: &mut Vec<usize>, item: usize) {
    if let Some(pos) = list.iter().position(|&x| x == item) {
        list.remove(pos);
    }
}

fn replace_item(list: &mut [usize], from: usize, to: usize) {
    if let Some(slot) = list.iter_mut().find(|x| **x == from) {
        *slot = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{icosahedron, subdivide};
    use crate::random::XorShift128;

    fn find_rotatable_edge(mesh: &MeshGraph) -> usize {
        (0..mesh.edge_count())
            .find(|&e| {
                let mut trial = mesh.clone();
                rotate_edge(&mut trial, e).is_ok()
            })
            .unwrap()
    }

    #[test]
    fn test_icosahedron_edges_not_rotatable() {
        // Every node has exactly 5 faces, so no endpoint may lose one
        let mut mesh = icosahedron().unwrap();
        for edge in 0..mesh.edge_count() {
            assert!(matches!(
                rotate_edge(&mut mesh, edge),
                Err(PlanetError::ConstraintViolation { .. })
            ));
        }
    }

    #[test]
    fn test_rotate_edge_updates_adjacency() {
        let mut mesh = subdivide(&icosahedron().unwrap(), 4).unwrap();
        let edge = find_rotatable_edge(&mesh);
        let before_nodes = mesh.edges[edge].nodes;
        let before_valence: Vec<usize> = (0..mesh.node_count()).map(|n| mesh.valence(n)).collect();

        rotate_edge(&mut mesh, edge).unwrap();
        let after_nodes = mesh.edges[edge].nodes;
        assert!(!after_nodes.contains(&before_nodes[0]));
        assert!(!after_nodes.contains(&before_nodes[1]));

        for &n in &before_nodes {
            assert_eq!(mesh.valence(n), before_valence[n] - 1);
            assert!(!mesh.nodes[n].edges.contains(&edge));
        }
        for &n in &after_nodes {
            assert_eq!(mesh.valence(n), before_valence[n] + 1);
            assert!(mesh.nodes[n].edges.contains(&edge));
        }

        // opposite-edge convention and edge/face agreement still hold
        for (face_idx, face) in mesh.faces.iter().enumerate() {
            for i in 0..3 {
                let e = &mesh.edges[face.edges[i]];
                assert!(!e.nodes.contains(&face.nodes[i]));
                assert!(e.faces.contains(&face_idx));
            }
            for &n in &face.nodes {
                assert!(mesh.nodes[n].faces.contains(&face_idx));
            }
        }
    }

    #[test]
    fn test_distort_respects_valence_bounds() {
        let mut mesh = subdivide(&icosahedron().unwrap(), 6).unwrap();
        let mut rng = XorShift128::new([4, 4, 4, 4]);
        let flips = mesh.edge_count() / 5;
        let report = distort_mesh(&mut mesh, flips, &mut rng).unwrap();
        assert_eq!(report.requested, flips);
        assert_eq!(report.performed + report.skipped, flips);
        assert!(report.performed > 0);
        for node in 0..mesh.node_count() {
            assert!((MIN_VALENCE..=MAX_VALENCE).contains(&mesh.valence(node)));
        }
        assert_eq!(mesh.euler_characteristic(), 2);
    }

    #[test]
    fn test_distort_stalls_gracefully() {
        let mut mesh = icosahedron().unwrap();
        let mut rng = XorShift128::default();
        let report = distort_mesh(&mut mesh, 3, &mut rng).unwrap();
        assert_eq!(report.performed, 0);
        assert_eq!(report.skipped, 3);
    }
}
