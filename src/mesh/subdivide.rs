//! Geometric subdivision of a triangle mesh on the sphere

use glam::Vec3;

use super::MeshGraph;
use crate::error::{PlanetError, Result};

/// The node chain an original edge is split into, from `nodes[0]` to `nodes[1]`
struct EdgeChain {
    nodes: Vec<usize>,
}

impl EdgeChain {
    /// Chain node indices starting from `start`
    fn from_node(&self, start: usize) -> Vec<usize> {
        if self.nodes.first() == Some(&start) {
            self.nodes.clone()
        } else {
            self.nodes.iter().rev().copied().collect()
        }
    }
}

/// Spherical linear interpolation between two unit vectors
pub(crate) fn slerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let omega = a.dot(b).clamp(-1.0, 1.0).acos();
    if omega < 1e-6 {
        return a.lerp(b, t).normalize_or_zero();
    }
    let sin_omega = omega.sin();
    (a * ((1.0 - t) * omega).sin() + b * (t * omega).sin()) / sin_omega
}

/// Split every edge of `base` into `degree` segments and every face into
/// `degree²` faces, placing new nodes along great circles
///
/// Node indices of `base` are preserved; new edge nodes follow in edge
/// order, then face-interior nodes in face order.
///
/// # Errors
///
/// Returns `DegenerateInput` if `degree` is zero.
pub fn subdivide(base: &MeshGraph, degree: usize) -> Result<MeshGraph> {
    if degree < 1 {
        return Err(PlanetError::DegenerateInput(format!(
            "subdivision degree must be >= 1 (got {})",
            degree
        )));
    }
    if degree == 1 {
        return Ok(base.clone());
    }

    let d2 = degree * degree;
    let mut positions: Vec<Vec3> = Vec::with_capacity(10 * d2 + 2);
    positions.extend(base.nodes.iter().map(|node| node.position));

    let mut chains = Vec::with_capacity(base.edges.len());
    for edge in &base.edges {
        let [a, b] = edge.nodes;
        let (pa, pb) = (positions[a], positions[b]);
        let mut nodes = Vec::with_capacity(degree + 1);
        nodes.push(a);
        for step in 1..degree {
            positions.push(slerp(pa, pb, step as f32 / degree as f32));
            nodes.push(positions.len() - 1);
        }
        nodes.push(b);
        chains.push(EdgeChain { nodes });
    }

    let mut triangles: Vec<[usize; 3]> = Vec::with_capacity(20 * d2);
    for face in &base.faces {
        let [a, b, _] = face.nodes;
        // edges[i] is opposite nodes[i]
        let ab = chains[face.edges[2]].from_node(a);
        let ac = chains[face.edges[1]].from_node(a);
        let bc = chains[face.edges[0]].from_node(b);

        // rows[i] runs from ab[i] to ac[i]; the last row is the bc chain
        let mut rows: Vec<Vec<usize>> = Vec::with_capacity(degree + 1);
        rows.push(vec![a]);
        for i in 1..degree {
            let (start, end) = (ab[i], ac[i]);
            let (ps, pe) = (positions[start], positions[end]);
            let mut row = Vec::with_capacity(i + 1);
            row.push(start);
            for j in 1..i {
                positions.push(slerp(ps, pe, j as f32 / i as f32));
                row.push(positions.len() - 1);
            }
            row.push(end);
            rows.push(row);
        }
        rows.push(bc);

        for i in 0..degree {
            let (upper, lower) = (&rows[i], &rows[i + 1]);
            for j in 0..=i {
                triangles.push([upper[j], lower[j], lower[j + 1]]);
                if j < i {
                    triangles.push([upper[j], lower[j + 1], upper[j + 1]]);
                }
            }
        }
    }

    MeshGraph::from_triangles(positions, &triangles)
}
