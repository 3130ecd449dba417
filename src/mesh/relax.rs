//! Relaxation toward uniform triangle density
//!
//! Each pass pulls every face's corners toward (or pushes them away from)
//! the face centroid until they sit at an ideal distance derived from the
//! average face area. Moves that would spin an edge around are damped so
//! the relaxation cannot fold triangles over.

use std::f32::consts::PI;

use glam::Vec3;

use super::{triangle_centroid, MeshGraph};
use crate::util::{map_indices, Schedule, Stage, StageTimer};

/// Options for iterated relaxation
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxOptions {
    /// Maximum number of passes run by [`relax_until_converged`]
    pub max_iterations: usize,
    /// Fraction of the ideal correction applied per pass
    pub multiplier: f32,
    /// Larger values demand a smaller change between passes before stopping
    pub convergence_divisor: f32,
}

impl Default for RelaxOptions {
    fn default() -> Self {
        Self {
            max_iterations: 300,
            multiplier: 0.5,
            convergence_divisor: 50_000.0,
        }
    }
}

/// Run one relaxation pass and return the total node displacement
///
/// Shifts are computed per face, then gathered in face order so the result
/// does not depend on how the per-face work was scheduled.
pub fn relax_mesh(mesh: &mut MeshGraph, multiplier: f32) -> f32 {
    relax_pass(mesh, multiplier, Schedule::default())
}

fn relax_pass(mesh: &mut MeshGraph, multiplier: f32, schedule: Schedule) -> f32 {
    if mesh.faces.is_empty() {
        return 0.0;
    }

    let ideal_face_area = 4.0 * PI / mesh.faces.len() as f32;
    let ideal_edge_length = (ideal_face_area * 4.0 / 3.0_f32.sqrt()).sqrt();
    let ideal_distance = ideal_edge_length * 3.0_f32.sqrt() / 3.0 * 0.9;

    let face_shifts: Vec<[Vec3; 3]> = {
        let nodes = &mesh.nodes;
        let faces = &mesh.faces;
        map_indices(schedule, faces.len(), |f| {
            let corners = faces[f].nodes.map(|n| nodes[n].position);
            let centroid = triangle_centroid(corners[0], corners[1], corners[2]);
            corners.map(|p| {
                let v = centroid - p;
                let length = v.length();
                if length > 0.0 {
                    v * (multiplier * (length - ideal_distance) / length)
                } else {
                    Vec3::ZERO
                }
            })
        })
    };

    let mut shifts = vec![Vec3::ZERO; mesh.nodes.len()];
    for (face, face_shift) in mesh.faces.iter().zip(&face_shifts) {
        for (&node, &shift) in face.nodes.iter().zip(face_shift) {
            shifts[node] += shift;
        }
    }

    // Tangential part of the shift only, then back onto the sphere
    let targets: Vec<Vec3> = {
        let nodes = &mesh.nodes;
        map_indices(schedule, nodes.len(), |n| {
            let p = nodes[n].position;
            let s = shifts[n];
            (p + (s - p * p.dot(s))).normalize_or_zero()
        })
    };

    let mut suppression = vec![0.0_f32; mesh.nodes.len()];
    for edge in &mesh.edges {
        let [a, b] = edge.nodes;
        let old_dir = (mesh.nodes[b].position - mesh.nodes[a].position).normalize_or_zero();
        let new_dir = (targets[b] - targets[a]).normalize_or_zero();
        let amount = (1.0 - old_dir.dot(new_dir)) * 0.5;
        suppression[a] = suppression[a].max(amount);
        suppression[b] = suppression[b].max(amount);
    }

    let mut total_shift = 0.0;
    for ((node, target), supp) in mesh.nodes.iter_mut().zip(targets).zip(suppression) {
        let old = node.position;
        let t = 1.0 - supp.max(0.0).sqrt();
        node.position = old.lerp(target, t).normalize_or_zero();
        total_shift += (old - node.position).length();
    }

    total_shift
}

/// Relax repeatedly until the displacement stops changing
///
/// Stops once two consecutive passes differ by less than a threshold that
/// scales with the node count, or after `options.max_iterations` passes.
/// Returns the number of passes run.
pub fn relax_until_converged(mesh: &mut MeshGraph, options: RelaxOptions) -> usize {
    if options.max_iterations == 0 || mesh.nodes.is_empty() {
        return 0;
    }
    let _t = StageTimer::start(Stage::Relaxation);

    let node_count = mesh.nodes.len() as f32;
    let average_node_radius = (4.0 * PI / node_count).sqrt();
    let min_delta = average_node_radius / options.convergence_divisor * node_count;

    let mut prior = relax_mesh(mesh, options.multiplier);
    let mut iterations = 1;
    while iterations < options.max_iterations {
        let current = relax_mesh(mesh, options.multiplier);
        iterations += 1;
        let delta = (current - prior).abs();
        log::trace!("Relax pass {}: shift {:.6}, delta {:.6}", iterations, current, delta);
        if delta < min_delta {
            break;
        }
        prior = current;
    }

    log::debug!(
        "Relaxation finished after {} of at most {} passes (threshold {:.6})",
        iterations,
        options.max_iterations,
        min_delta
    );
    iterations
}
