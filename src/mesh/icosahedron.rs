//! The base icosahedron

use glam::Vec3;

use super::MeshGraph;
use crate::error::Result;

/// Triangles of the icosahedron, by node index
const FACES: [[usize; 3]; 20] = [
    [0, 1, 8],
    [0, 4, 5],
    [0, 5, 10],
    [0, 8, 4],
    [0, 10, 1],
    [1, 6, 8],
    [1, 7, 6],
    [1, 10, 7],
    [2, 3, 11],
    [2, 4, 9],
    [2, 5, 4],
    [2, 9, 3],
    [2, 11, 5],
    [3, 6, 7],
    [3, 7, 11],
    [3, 9, 6],
    [4, 8, 9],
    [5, 11, 10],
    [6, 9, 8],
    [7, 10, 11],
];

/// The 12-node, 30-edge, 20-face icosahedron inscribed in the unit sphere
pub fn icosahedron() -> Result<MeshGraph> {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let du = 1.0 / (phi * phi + 1.0).sqrt();
    let dv = phi * du;

    let positions = vec![
        Vec3::new(0.0, dv, du),
        Vec3::new(0.0, dv, -du),
        Vec3::new(0.0, -dv, du),
        Vec3::new(0.0, -dv, -du),
        Vec3::new(du, 0.0, dv),
        Vec3::new(-du, 0.0, dv),
        Vec3::new(du, 0.0, -dv),
        Vec3::new(-du, 0.0, -dv),
        Vec3::new(dv, du, 0.0),
        Vec3::new(dv, -du, 0.0),
        Vec3::new(-dv, du, 0.0),
        Vec3::new(-dv, -du, 0.0),
    ];

    // Wind every face counter-clockwise as seen from outside
    let triangles: Vec<[usize; 3]> = FACES
        .iter()
        .map(|&[a, b, c]| {
            let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
            if (pb - pa).cross(pc - pa).dot(pa + pb + pc) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect();

    MeshGraph::from_triangles(positions, &triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosahedron_counts() {
        let mesh = icosahedron().unwrap();
        assert_eq!(mesh.node_count(), 12);
        assert_eq!(mesh.edge_count(), 30);
        assert_eq!(mesh.face_count(), 20);
        assert_eq!(mesh.euler_characteristic(), 2);
    }

    #[test]
    fn test_icosahedron_regular() {
        let mesh = icosahedron().unwrap();
        for node in &mesh.nodes {
            assert!((node.position.length() - 1.0).abs() < 1e-5);
            assert_eq!(node.faces.len(), 5);
            assert_eq!(node.edges.len(), 5);
        }

        let first = &mesh.edges[0];
        let reference = mesh.nodes[first.nodes[0]]
            .position
            .distance(mesh.nodes[first.nodes[1]].position);
        for edge in &mesh.edges {
            let length = mesh.nodes[edge.nodes[0]]
                .position
                .distance(mesh.nodes[edge.nodes[1]].position);
            assert!((length - reference).abs() < 1e-5);
        }
    }

    #[test]
    fn test_icosahedron_winding() {
        let mesh = icosahedron().unwrap();
        for face in &mesh.faces {
            let [a, b, c] = face.nodes.map(|n| mesh.nodes[n].position);
            assert!((b - a).cross(c - a).dot(face.centroid) > 0.0);
        }
    }
}
