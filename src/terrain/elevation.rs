//! Elevation from plate boundary stress
//!
//! Boundary corners get an elevation from the relative motion of the plates
//! meeting there. That elevation is then carried inland by a wavefront
//! ordered on distance from the boundary, each boundary corner's
//! [`Interaction`] curve blending it toward the plate's base elevation.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::Vec3;
use ordered_float::OrderedFloat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::plates::Plate;
use crate::topology::Topology;

const STRESS_BLUR_ITERATIONS: usize = 3;
const STRESS_BLUR_CENTER_WEIGHT: f32 = 0.4;
/// Stress magnitude needed before a boundary counts as active
const STRESS_THRESHOLD: f32 = 0.3;

/// How two plates interact at a boundary, which selects the elevation curve
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Plates of the same kind pushing into each other
    Colliding,
    /// Continental plate pushing against an oceanic one
    Subducting,
    /// Oceanic plate pushing against a continental one
    Superducting,
    /// Plates pulling apart
    Diverging,
    /// Plates sliding past each other
    Shearing,
    /// No significant stress
    Dormant,
}

impl Interaction {
    /// Elevation of an interior corner reached from a boundary corner
    ///
    /// `t = distance_to_boundary / (distance_to_boundary + distance_to_root)`
    /// runs from 0 at the boundary to 1 at the plate root.
    pub fn elevation(
        self,
        distance_to_boundary: f32,
        distance_to_root: f32,
        boundary_elevation: f32,
        plate_elevation: f32,
        pressure: f32,
    ) -> f32 {
        let total = distance_to_boundary + distance_to_root;
        let t = if total > 0.0 { distance_to_boundary / total } else { 0.0 };
        let fall_off = |cutoff: f32| {
            if t < cutoff {
                let s = t / cutoff;
                plate_elevation + (s - 1.0).powi(2) * (boundary_elevation - plate_elevation)
            } else {
                plate_elevation
            }
        };

        match self {
            Interaction::Colliding => fall_off(0.5),
            Interaction::Superducting => {
                if t < 0.2 {
                    let s = t / 0.2;
                    boundary_elevation + s * (plate_elevation - boundary_elevation + pressure / 2.0)
                } else if t < 0.5 {
                    let s = (t - 0.2) / 0.3;
                    plate_elevation + (s - 1.0).powi(2) * pressure / 2.0
                } else {
                    plate_elevation
                }
            }
            Interaction::Subducting => {
                plate_elevation + (t - 1.0).powi(2) * (boundary_elevation - plate_elevation)
            }
            Interaction::Diverging => fall_off(0.3),
            Interaction::Shearing => fall_off(0.2),
            Interaction::Dormant => {
                let difference = boundary_elevation - plate_elevation;
                t * t * difference * (2.0 * t - 3.0) + boundary_elevation
            }
        }
    }
}

/// Squash a raw stress magnitude into `(-1, 1)`
#[inline]
fn squash(x: f32) -> f32 {
    2.0 / (1.0 + (-x / 30.0).exp()) - 1.0
}

/// Pressure and shear from the relative motion of two plates at a boundary
fn stress(movement0: Vec3, movement1: Vec3, boundary: Vec3, normal: Vec3) -> (f32, f32) {
    let relative = movement0 - movement1;
    let pressure_vector = relative.project_onto(normal);
    let pressure_vector = if pressure_vector.is_finite() { pressure_vector } else { Vec3::ZERO };
    let mut pressure = pressure_vector.length();
    if pressure_vector.dot(normal) > 0.0 {
        pressure = -pressure;
    }
    let shear_vector = relative.project_onto(boundary);
    let shear = if shear_vector.is_finite() { shear_vector.length() } else { 0.0 };
    (squash(pressure), squash(shear))
}

/// A boundary corner with exactly one border inside a plate
struct BoundarySeed {
    corner: usize,
    /// Slot of the inner border in the corner's border list
    inner: usize,
    /// Plate the inner border lies in
    plate: usize,
    /// Plate across the boundary
    other: usize,
}

/// Propagation origin carried by the wavefront
#[derive(Clone, Copy)]
struct Origin {
    elevation: f32,
    pressure: f32,
    plate: usize,
    curve: Interaction,
}

/// Mark plate boundaries and compute corner and tile elevations
///
/// Fills `between_plates`, `pressure`, `shear`, `elevation` and
/// `distance_to_plate_boundary` on the topology, plus the boundary lists and
/// circumference of every plate.
pub fn compute_elevation(topology: &mut Topology, plates: &mut [Plate]) {
    mark_boundaries(topology, plates);

    let boundary: Vec<usize> = topology
        .corners
        .iter()
        .filter(|c| c.between_plates)
        .map(|c| c.id)
        .collect();

    let seeds = compute_stress(topology, plates, &boundary);
    blur_stress(topology, &boundary);
    propagate(topology, plates, &boundary, &seeds);

    for tile in &mut topology.tiles {
        let sum: f32 = tile.corners.iter().map(|&c| topology.corners[c].elevation).sum();
        tile.elevation = if tile.corners.is_empty() {
            0.0
        } else {
            sum / tile.corners.len() as f32
        };
    }
}

fn mark_boundaries(topology: &mut Topology, plates: &mut [Plate]) {
    for corner in &mut topology.corners {
        corner.between_plates = false;
        corner.pressure = 0.0;
        corner.shear = 0.0;
        corner.elevation = 0.0;
        corner.distance_to_plate_boundary = 0.0;
    }
    for plate in plates.iter_mut() {
        plate.boundary_borders.clear();
        plate.boundary_corners.clear();
        plate.circumference = 0.0;
    }

    for border in &mut topology.borders {
        let p0 = topology.tiles[border.tiles[0]].plate;
        let p1 = topology.tiles[border.tiles[1]].plate;
        border.between_plates = p0 != p1;
        if !border.between_plates {
            continue;
        }
        for &c in &border.corners {
            topology.corners[c].between_plates = true;
        }
        for plate in [p0, p1].into_iter().flatten() {
            plates[plate].boundary_borders.push(border.id);
            plates[plate].circumference += border.length;
        }
    }

    for corner in topology.corners.iter().filter(|c| c.between_plates) {
        let mut seen: Vec<usize> = Vec::with_capacity(3);
        for &t in &corner.tiles {
            if let Some(p) = topology.tiles[t].plate {
                if !seen.contains(&p) {
                    seen.push(p);
                    plates[p].boundary_corners.push(corner.id);
                }
            }
        }
    }
}

fn plate_of(topology: &Topology, tile: usize) -> usize {
    topology.tiles[tile].plate.unwrap_or(0)
}

fn compute_stress(topology: &mut Topology, plates: &[Plate], boundary: &[usize]) -> Vec<BoundarySeed> {
    let mut seeds = Vec::new();

    for &c in boundary {
        let corner = &topology.corners[c];
        let position = corner.position;
        let inner: Vec<usize> = (0..3)
            .filter(|&slot| !topology.borders[corner.borders[slot]].between_plates)
            .collect();

        let (pressure, shear) = if let &[i] = inner.as_slice() {
            // The inner border joins tiles i+1 and i+2, tile i is across the boundary
            let plate = plate_of(topology, corner.tiles[(i + 1) % 3]);
            let other = plate_of(topology, corner.tiles[i]);
            let far0 = topology.corners[corner.corners[(i + 1) % 3]].position;
            let far1 = topology.corners[corner.corners[(i + 2) % 3]].position;
            let boundary_vector = far0 - far1;
            let normal = boundary_vector.cross(position);
            seeds.push(BoundarySeed {
                corner: c,
                inner: i,
                plate,
                other,
            });
            stress(
                plates[plate].movement_at(position),
                plates[other].movement_at(position),
                boundary_vector,
                normal,
            )
        } else {
            let ids = corner.tiles.map(|t| plate_of(topology, t));
            let movements = ids.map(|p| plates[p].movement_at(position));
            let (mut pressure, mut shear) = (0.0, 0.0);
            // Border k runs toward corners[k] and separates tiles k+1 and k+2,
            // its normal points into tile k+1
            for k in 0..3 {
                let boundary_vector = topology.corners[corner.corners[k]].position - position;
                let normal = boundary_vector.cross(position);
                let (p, s) = stress(
                    movements[(k + 1) % 3],
                    movements[(k + 2) % 3],
                    boundary_vector,
                    normal,
                );
                pressure += p;
                shear += s;
            }
            (pressure / 3.0, shear / 3.0)
        };

        let corner = &mut topology.corners[c];
        corner.pressure = pressure;
        corner.shear = shear;
    }

    seeds
}

fn blur_stress(topology: &mut Topology, boundary: &[usize]) {
    let mut pressure = vec![0.0; boundary.len()];
    let mut shear = vec![0.0; boundary.len()];

    for _ in 0..STRESS_BLUR_ITERATIONS {
        for (i, &c) in boundary.iter().enumerate() {
            let corner = &topology.corners[c];
            let (mut sum_pressure, mut sum_shear, mut count) = (0.0, 0.0, 0);
            for &n in &corner.corners {
                let neighbour = &topology.corners[n];
                if neighbour.between_plates {
                    sum_pressure += neighbour.pressure;
                    sum_shear += neighbour.shear;
                    count += 1;
                }
            }
            if count == 0 {
                pressure[i] = corner.pressure;
                shear[i] = corner.shear;
            } else {
                let keep = STRESS_BLUR_CENTER_WEIGHT;
                pressure[i] = corner.pressure * keep + sum_pressure / count as f32 * (1.0 - keep);
                shear[i] = corner.shear * keep + sum_shear / count as f32 * (1.0 - keep);
            }
        }
        for (i, &c) in boundary.iter().enumerate() {
            topology.corners[c].pressure = pressure[i];
            topology.corners[c].shear = shear[i];
        }
    }
}

fn propagate(topology: &mut Topology, plates: &[Plate], boundary: &[usize], seeds: &[BoundarySeed]) {
    let corner_count = topology.corners.len();
    let mut elevated = vec![false; corner_count];
    let mut best = vec![f32::INFINITY; corner_count];
    let mut origins: Vec<Origin> = Vec::with_capacity(seeds.len());
    // (distance, insertion order, corner, origin)
    let mut queue: BinaryHeap<Reverse<(OrderedFloat<f32>, usize, usize, usize)>> = BinaryHeap::new();
    let mut sequence = 0usize;

    // Every boundary corner is fixed here; two-plate corners are refined
    // from their seed below, three-plate corners keep this value
    for &c in boundary {
        let corner = &topology.corners[c];
        let levels = corner.tiles.map(|t| plates[plate_of(topology, t)].elevation);
        let max = levels[0].max(levels[1]).max(levels[2]);
        let mean = (levels[0] + levels[1] + levels[2]) / 3.0;
        let elevation = boundary_elevation(corner.pressure, corner.shear, max, mean);
        topology.corners[c].elevation = elevation;
        elevated[c] = true;
        best[c] = 0.0;
    }

    for seed in seeds {
        let corner = &topology.corners[seed.corner];
        let (pressure, shear) = (corner.pressure, corner.shear);
        let inner_border = corner.borders[seed.inner];
        let next = corner.corners[seed.inner];
        let own = &plates[seed.plate];
        let other = &plates[seed.other];
        let max = own.elevation.max(other.elevation);
        let mean = (own.elevation + other.elevation) / 2.0;
        let elevation = boundary_elevation(pressure, shear, max, mean);

        let curve = if pressure > STRESS_THRESHOLD {
            if own.oceanic == other.oceanic {
                Interaction::Colliding
            } else if other.oceanic {
                Interaction::Subducting
            } else {
                Interaction::Superducting
            }
        } else if pressure < -STRESS_THRESHOLD {
            Interaction::Diverging
        } else if shear > STRESS_THRESHOLD {
            Interaction::Shearing
        } else {
            Interaction::Dormant
        };

        topology.corners[seed.corner].elevation = elevation;

        let length = topology.borders[inner_border].length;
        if length > 0.0 {
            origins.push(Origin {
                elevation,
                pressure,
                plate: seed.plate,
                curve,
            });
            queue.push(Reverse((OrderedFloat(length), sequence, next, origins.len() - 1)));
            sequence += 1;
        }
    }

    while let Some(Reverse((OrderedFloat(distance), _, c, o))) = queue.pop() {
        if elevated[c] {
            continue;
        }
        elevated[c] = true;
        let origin = origins[o];
        let corner = &mut topology.corners[c];
        corner.distance_to_plate_boundary = distance;
        corner.elevation = origin.curve.elevation(
            distance,
            corner.distance_to_plate_root,
            origin.elevation,
            plates[origin.plate].elevation,
            origin.pressure,
        );

        let corner = &topology.corners[c];
        for slot in 0..3 {
            let border = &topology.borders[corner.borders[slot]];
            if border.between_plates {
                continue;
            }
            let next = corner.corners[slot];
            let candidate = distance + border.length;
            if !elevated[next] && candidate < best[next] {
                best[next] = candidate;
                queue.push(Reverse((OrderedFloat(candidate), sequence, next, o)));
                sequence += 1;
            }
        }
    }

    let mut unreached = 0;
    for corner in topology.corners.iter_mut().filter(|c| !elevated[c.id]) {
        let plate = topology.tiles[corner.tiles[0]].plate.unwrap_or(0);
        corner.elevation = plates.get(plate).map_or(0.0, |p| p.elevation);
        unreached += 1;
    }
    if unreached > 0 {
        log::debug!("{} corners not reached from a boundary, using plate elevation", unreached);
    }
}

/// Elevation at a boundary corner from its stress and the plates meeting there
fn boundary_elevation(pressure: f32, shear: f32, max: f32, mean: f32) -> f32 {
    if pressure > STRESS_THRESHOLD {
        max + pressure
    } else if pressure < -STRESS_THRESHOLD {
        max - pressure / 4.0
    } else if shear > STRESS_THRESHOLD {
        max + shear / 8.0
    } else {
        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_mesh;
    use crate::random::XorShift128;
    use crate::terrain::plates::assign_plates;
    use crate::topology::derive_topology;

    fn setup(plate_count: usize) -> (Topology, Vec<Plate>) {
        let mut rng = XorShift128::new([21, 22, 23, 24]);
        let mesh = build_mesh(8, 0.2, &mut rng).unwrap();
        let mut topology = derive_topology(&mesh, 1000.0).unwrap();
        let plates = assign_plates(&mut topology, plate_count, 0.6, &mut rng);
        (topology, plates)
    }

    #[test]
    fn test_curves_meet_boundary_and_plate() {
        let curves = [
            Interaction::Colliding,
            Interaction::Subducting,
            Interaction::Diverging,
            Interaction::Shearing,
            Interaction::Dormant,
        ];
        for curve in curves {
            // at the boundary
            assert!((curve.elevation(0.0, 10.0, 1.0, 0.2, 0.5) - 1.0).abs() < 1e-6);
            // at the root
            assert!((curve.elevation(10.0, 0.0, 1.0, 0.2, 0.5) - 0.2).abs() < 1e-6);
        }
        let superducting = Interaction::Superducting;
        assert!((superducting.elevation(0.0, 10.0, 1.0, 0.2, 0.5) - 1.0).abs() < 1e-6);
        assert!((superducting.elevation(2.0, 8.0, 1.0, 0.2, 0.5) - 0.45).abs() < 1e-5);
        assert!((superducting.elevation(9.0, 1.0, 1.0, 0.2, 0.5) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_curve_cutoffs() {
        // beyond the cutoff the plate elevation is returned
        assert_eq!(Interaction::Colliding.elevation(6.0, 4.0, 1.0, 0.2, 0.0), 0.2);
        assert_eq!(Interaction::Diverging.elevation(4.0, 6.0, 1.0, 0.2, 0.0), 0.2);
        assert_eq!(Interaction::Shearing.elevation(3.0, 7.0, 1.0, 0.2, 0.0), 0.2);
        // degenerate distances collapse to the boundary value
        assert_eq!(Interaction::Dormant.elevation(0.0, 0.0, 0.7, 0.1, 0.0), 0.7);
    }

    #[test]
    fn test_stress_sign() {
        let boundary = Vec3::X;
        let normal = Vec3::Y;
        // moving apart along the normal reads as tension
        let (pressure, shear) = stress(Vec3::Y * 10.0, Vec3::ZERO, boundary, normal);
        assert!(pressure < 0.0);
        assert!(shear.abs() < 1e-6);
        // moving together reads as compression
        let (pressure, _) = stress(-Vec3::Y * 10.0, Vec3::ZERO, boundary, normal);
        assert!(pressure > 0.0);
        // sliding along the boundary is pure shear
        let (pressure, shear) = stress(Vec3::X * 10.0, Vec3::ZERO, boundary, normal);
        assert!(pressure.abs() < 1e-6);
        assert!(shear > 0.0 && shear < 1.0);
    }

    #[test]
    fn test_boundaries_marked() {
        let (mut topology, mut plates) = setup(8);
        compute_elevation(&mut topology, &mut plates);
        for border in &topology.borders {
            let differ = topology.tiles[border.tiles[0]].plate != topology.tiles[border.tiles[1]].plate;
            assert_eq!(border.between_plates, differ);
            if differ {
                for &c in &border.corners {
                    assert!(topology.corners[c].between_plates);
                }
            }
        }
        for plate in &plates {
            assert!(!plate.boundary_borders.is_empty());
            assert!(!plate.boundary_corners.is_empty());
            assert!(plate.circumference > 0.0);
        }
    }

    #[test]
    fn test_elevation_finite_and_bounded() {
        let (mut topology, mut plates) = setup(10);
        compute_elevation(&mut topology, &mut plates);
        for corner in &topology.corners {
            assert!(corner.elevation.is_finite());
            assert!(corner.pressure.abs() < 1.0 && corner.shear.abs() < 1.0);
            assert!(corner.elevation > -2.0 && corner.elevation < 2.0);
        }
        for tile in &topology.tiles {
            let mean: f32 = tile.corners.iter().map(|&c| topology.corners[c].elevation).sum::<f32>()
                / tile.corners.len() as f32;
            assert!((tile.elevation - mean).abs() < 1e-6);
        }
    }

    #[test]
    fn test_interior_distances_positive() {
        let (mut topology, mut plates) = setup(6);
        compute_elevation(&mut topology, &mut plates);
        for corner in &topology.corners {
            if corner.between_plates {
                assert_eq!(corner.distance_to_plate_boundary, 0.0);
            } else {
                assert!(corner.distance_to_plate_boundary >= 0.0);
            }
        }
        let reached = topology
            .corners
            .iter()
            .filter(|c| !c.between_plates && c.distance_to_plate_boundary > 0.0)
            .count();
        assert!(reached > 0);
    }

    #[test]
    fn test_single_plate_uses_plate_elevation() {
        let (mut topology, mut plates) = setup(1);
        compute_elevation(&mut topology, &mut plates);
        let level = plates[0].elevation;
        for corner in &topology.corners {
            assert!(!corner.between_plates);
            assert_eq!(corner.elevation, level);
        }
    }

    fn boundary_list(topology: &Topology) -> Vec<usize> {
        topology.corners.iter().filter(|c| c.between_plates).map(|c| c.id).collect()
    }

    #[test]
    fn test_pressure_follows_closing_motion() {
        for rate in [0.1, -0.1] {
            let (mut topology, mut plates) = setup(2);
            assert_eq!(plates.len(), 2);
            let axis = plates[0].root_position.cross(plates[1].root_position).normalize();
            plates[0].drift_axis = axis;
            plates[0].drift_rate = rate;
            plates[0].spin_rate = 0.0;
            plates[1].drift_rate = 0.0;
            plates[1].spin_rate = 0.0;

            mark_boundaries(&mut topology, &mut plates);
            let boundary = boundary_list(&topology);
            let seeds = compute_stress(&mut topology, &plates, &boundary);

            let (mut counted, mut agree) = (0, 0);
            for seed in &seeds {
                let corner = &topology.corners[seed.corner];
                let side = |plate: usize| {
                    let positions: Vec<Vec3> = corner
                        .tiles
                        .iter()
                        .filter(|&&t| plate_of(&topology, t) == plate)
                        .map(|&t| topology.tiles[t].position)
                        .collect();
                    positions.iter().sum::<Vec3>() / positions.len() as f32
                };
                let toward_other = (side(seed.other) - side(seed.plate)).normalize_or_zero();
                let relative = plates[seed.plate].movement_at(corner.position)
                    - plates[seed.other].movement_at(corner.position);
                let closing = relative.dot(toward_other);
                if closing.abs() > 1.0 && corner.pressure.abs() > 0.05 {
                    counted += 1;
                    if (closing > 0.0) == (corner.pressure > 0.0) {
                        agree += 1;
                    }
                }
            }
            assert!(counted > 10, "only {} corners with clear motion", counted);
            assert!(
                agree as f32 >= 0.8 * counted as f32,
                "rate {}: {} of {} corners agree",
                rate,
                agree,
                counted
            );
        }
    }

    #[test]
    fn test_three_plate_corner_pairs_adjacent_tiles() {
        let (mut topology, mut plates) = setup(3);
        assert_eq!(plates.len(), 3);
        let c = topology.corners.len() / 2;
        let corner_tiles = topology.corners[c].tiles;
        for tile in &mut topology.tiles {
            tile.plate = Some(2);
        }
        for (plate, &t) in corner_tiles.iter().enumerate() {
            topology.tiles[t].plate = Some(plate);
        }

        // only the plate of tiles[0] moves, straight through the corner
        let position = topology.corners[c].position;
        let start = topology.tiles[corner_tiles[0]].position;
        plates[0].drift_axis = start.cross(position).normalize();
        plates[0].drift_rate = 0.1;
        plates[0].spin_rate = 0.0;
        for plate in &mut plates[1..] {
            plate.drift_rate = 0.0;
            plate.spin_rate = 0.0;
        }

        mark_boundaries(&mut topology, &mut plates);
        let boundary = boundary_list(&topology);
        let seeds = compute_stress(&mut topology, &plates, &boundary);
        assert!(seeds.iter().all(|seed| seed.corner != c));

        let corner = &topology.corners[c];
        let movements = [0, 1, 2].map(|p| plates[p].movement_at(position));
        let (mut pressure, mut shear) = (0.0, 0.0);
        for k in 0..3 {
            let border = &topology.borders[corner.borders[k]];
            assert!(border.tiles.contains(&corner.tiles[(k + 1) % 3]));
            assert!(border.tiles.contains(&corner.tiles[(k + 2) % 3]));
            let boundary_vector = topology.corners[corner.corners[k]].position - position;
            let normal = boundary_vector.cross(position);
            let (p, s) = stress(
                movements[(k + 1) % 3],
                movements[(k + 2) % 3],
                boundary_vector,
                normal,
            );
            pressure += p;
            shear += s;
        }
        assert!((corner.pressure - pressure / 3.0).abs() < 1e-6);
        assert!((corner.shear - shear / 3.0).abs() < 1e-6);
        // tiles[0] pushes into the other two plates
        assert!(corner.pressure > 0.1, "pressure {}", corner.pressure);
    }
}
