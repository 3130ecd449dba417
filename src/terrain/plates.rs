//! Tectonic plate assignment via randomized flood fill.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::f32::consts::PI;

use glam::Vec3;
use ordered_float::OrderedFloat;
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::topology::Topology;

/// Consecutive rejected root candidates before giving up on more plates
const MAX_ROOT_REJECTIONS: usize = 10_000;
/// Bound on drift and spin rates (radians per unit time)
const MAX_RATE: f32 = PI / 30.0;

/// A tectonic plate
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Plate {
    pub id: usize,
    /// 24-bit RGB colour
    pub color: u32,
    /// Unit axis the plate drifts around
    pub drift_axis: Vec3,
    pub drift_rate: f32,
    pub spin_rate: f32,
    /// Base elevation of the plate interior
    pub elevation: f32,
    pub oceanic: bool,
    /// Corner the plate grew from
    pub root: usize,
    /// Position of the root corner, also the spin axis
    pub root_position: Vec3,
    pub tiles: Vec<usize>,
    /// Corners on the plate's boundary
    pub boundary_corners: Vec<usize>,
    /// Borders separating this plate from another
    pub boundary_borders: Vec<usize>,
    pub area: f32,
    /// Total length of the boundary borders
    pub circumference: f32,
}

impl Plate {
    /// Surface velocity of the plate at `position`
    ///
    /// Sum of the drift around `drift_axis` and the spin around the root,
    /// each proportional to the distance from its axis.
    pub fn movement_at(&self, position: Vec3) -> Vec3 {
        rotation_velocity(self.drift_axis, self.drift_rate, position)
            + rotation_velocity(self.root_position, self.spin_rate, position)
    }

    /// Colour as RGB floats in `[0, 1]`
    pub fn color_rgb(&self) -> [f32; 3] {
        let channel = |shift: u32| ((self.color >> shift) & 0xff) as f32 / 255.0;
        [channel(16), channel(8), channel(0)]
    }
}

/// Velocity of `position` rotating around `axis` at `rate`
fn rotation_velocity(axis: Vec3, rate: f32, position: Vec3) -> Vec3 {
    let projected = position.project_onto(axis);
    let distance = (position - projected).length();
    if !distance.is_finite() {
        return Vec3::ZERO;
    }
    axis.cross(position).normalize_or_zero() * (rate * distance)
}

/// Uniformly random unit vector
pub(crate) fn random_unit_vector<R: Rng>(rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..2.0 * PI);
    let phi = rng.gen_range(-1.0f32..=1.0).acos();
    let sin_phi = phi.sin();
    Vec3::new(theta.cos() * sin_phi, theta.sin() * sin_phi, phi.cos())
}

/// Assign every tile to one of `plate_count` plates
///
/// Roots are drawn by rejection sampling over corners whose three tiles are
/// all still free. If no such corner turns up after many consecutive
/// draws, fewer plates are created. All plates then grow together from a
/// shared frontier, each step claiming a random frontier entry biased
/// toward older entries.
///
/// Fills `tile.plate` and `corner.distance_to_plate_root`.
pub fn assign_plates<R: Rng>(
    topology: &mut Topology,
    plate_count: usize,
    oceanic_rate: f32,
    rng: &mut R,
) -> Vec<Plate> {
    for tile in &mut topology.tiles {
        tile.plate = None;
    }

    let mut plates: Vec<Plate> = Vec::with_capacity(plate_count);
    let mut frontier: Vec<(usize, usize)> = Vec::new();
    let corner_count = topology.corners.len();

    while plates.len() < plate_count {
        let mut rejections = 0;
        let root = loop {
            let candidate = rng.gen_range(0..corner_count);
            let taken = topology.corners[candidate]
                .tiles
                .iter()
                .any(|&t| topology.tiles[t].plate.is_some());
            if !taken {
                break Some(candidate);
            }
            rejections += 1;
            if rejections >= MAX_ROOT_REJECTIONS {
                break None;
            }
        };
        let Some(root) = root else {
            log::warn!(
                "No free plate root after {} attempts, generating {} of {} plates",
                MAX_ROOT_REJECTIONS,
                plates.len(),
                plate_count
            );
            break;
        };

        let id = plates.len();
        let oceanic = rng.gen::<f32>() < oceanic_rate;
        let color = rng.gen_range(0..=0x00ff_ffff_u32);
        let drift_axis = random_unit_vector(rng);
        let drift_rate = rng.gen_range(-MAX_RATE..MAX_RATE);
        let spin_rate = rng.gen_range(-MAX_RATE..MAX_RATE);
        let elevation = if oceanic {
            rng.gen_range(-0.8..-0.3)
        } else {
            rng.gen_range(0.1..0.5)
        };

        let root_tiles = topology.corners[root].tiles;
        for &t in &root_tiles {
            topology.tiles[t].plate = Some(id);
        }
        for &t in &root_tiles {
            for &n in &topology.tiles[t].tiles {
                if topology.tiles[n].plate.is_none() {
                    frontier.push((n, id));
                }
            }
        }

        plates.push(Plate {
            id,
            color,
            drift_axis,
            drift_rate,
            spin_rate,
            elevation,
            oceanic,
            root,
            root_position: topology.corners[root].position,
            tiles: root_tiles.to_vec(),
            boundary_corners: Vec::new(),
            boundary_borders: Vec::new(),
            area: 0.0,
            circumference: 0.0,
        });
    }

    while !frontier.is_empty() {
        let draw: f32 = rng.gen();
        let index = ((draw * draw * frontier.len() as f32) as usize).min(frontier.len() - 1);
        let (tile, plate) = frontier.remove(index);
        if topology.tiles[tile].plate.is_some() {
            continue;
        }
        topology.tiles[tile].plate = Some(plate);
        plates[plate].tiles.push(tile);
        for &n in &topology.tiles[tile].tiles {
            if topology.tiles[n].plate.is_none() {
                frontier.push((n, plate));
            }
        }
    }

    for plate in &mut plates {
        plate.area = plate.tiles.iter().map(|&t| topology.tiles[t].area).sum();
    }

    distances_to_plate_roots(topology, &plates);

    log::debug!(
        "Assigned {} tiles to {} plates ({} oceanic)",
        topology.tiles.len(),
        plates.len(),
        plates.iter().filter(|p| p.oceanic).count()
    );

    plates
}

/// Shortest corner-graph distance from every corner to the nearest plate root
fn distances_to_plate_roots(topology: &mut Topology, plates: &[Plate]) {
    let mut best = vec![f32::INFINITY; topology.corners.len()];
    let mut queue: BinaryHeap<Reverse<(OrderedFloat<f32>, usize)>> = BinaryHeap::new();

    for plate in plates {
        best[plate.root] = 0.0;
        queue.push(Reverse((OrderedFloat(0.0), plate.root)));
    }

    while let Some(Reverse((OrderedFloat(distance), corner))) = queue.pop() {
        if distance > best[corner] {
            continue;
        }
        let c = &topology.corners[corner];
        for slot in 0..3 {
            let next = c.corners[slot];
            let candidate = distance + topology.borders[c.borders[slot]].length;
            if candidate < best[next] {
                best[next] = candidate;
                queue.push(Reverse((OrderedFloat(candidate), next)));
            }
        }
    }

    for (corner, distance) in topology.corners.iter_mut().zip(best) {
        corner.distance_to_plate_root = if distance.is_finite() { distance } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_mesh;
    use crate::random::XorShift128;
    use crate::topology::derive_topology;

    fn topology() -> Topology {
        let mut rng = XorShift128::new([3, 5, 7, 9]);
        let mesh = build_mesh(8, 0.2, &mut rng).unwrap();
        derive_topology(&mesh, 1000.0).unwrap()
    }

    #[test]
    fn test_every_tile_assigned() {
        let mut topology = topology();
        let mut rng = XorShift128::new([1, 2, 3, 4]);
        let plates = assign_plates(&mut topology, 12, 0.7, &mut rng);
        assert_eq!(plates.len(), 12);

        let owned: usize = plates.iter().map(|p| p.tiles.len()).sum();
        assert_eq!(owned, topology.tiles.len());
        for plate in &plates {
            for &t in &plate.tiles {
                assert_eq!(topology.tiles[t].plate, Some(plate.id));
            }
            assert!(plate.area > 0.0);
        }
    }

    #[test]
    fn test_plate_parameters_in_range() {
        let mut topology = topology();
        let mut rng = XorShift128::new([9, 9, 9, 9]);
        let plates = assign_plates(&mut topology, 20, 0.5, &mut rng);
        for plate in &plates {
            assert!(plate.color <= 0xff_ffff);
            assert!((plate.drift_axis.length() - 1.0).abs() < 1e-4);
            assert!(plate.drift_rate.abs() <= MAX_RATE);
            assert!(plate.spin_rate.abs() <= MAX_RATE);
            if plate.oceanic {
                assert!((-0.8..=-0.3).contains(&plate.elevation));
            } else {
                assert!((0.1..=0.5).contains(&plate.elevation));
            }
        }
    }

    #[test]
    fn test_oceanic_rate_extremes() {
        let mut topology = topology();
        let mut rng = XorShift128::new([4, 3, 2, 1]);
        let plates = assign_plates(&mut topology, 8, 1.0, &mut rng);
        assert!(plates.iter().all(|p| p.oceanic));
        let plates = assign_plates(&mut topology, 8, 0.0, &mut rng);
        assert!(plates.iter().all(|p| !p.oceanic));
    }

    #[test]
    fn test_root_distances() {
        let mut topology = topology();
        let mut rng = XorShift128::new([5, 5, 5, 5]);
        let plates = assign_plates(&mut topology, 6, 0.5, &mut rng);
        for plate in &plates {
            assert_eq!(topology.corners[plate.root].distance_to_plate_root, 0.0);
        }
        for corner in &topology.corners {
            assert!(corner.distance_to_plate_root >= 0.0);
            for slot in 0..3 {
                let next = &topology.corners[corner.corners[slot]];
                let step = topology.borders[corner.borders[slot]].length;
                assert!(corner.distance_to_plate_root <= next.distance_to_plate_root + step + 1e-2);
            }
        }
    }

    #[test]
    fn test_assignment_deterministic() {
        let mut a = topology();
        let mut b = topology();
        let pa = assign_plates(&mut a, 10, 0.6, &mut XorShift128::new([8, 8, 8, 8]));
        let pb = assign_plates(&mut b, 10, 0.6, &mut XorShift128::new([8, 8, 8, 8]));
        assert_eq!(pa, pb);
        assert_eq!(a, b);
    }

    #[test]
    fn test_movement() {
        let plate = Plate {
            id: 0,
            color: 0x80ff00,
            drift_axis: Vec3::Z,
            drift_rate: 0.1,
            spin_rate: 0.0,
            elevation: 0.2,
            oceanic: false,
            root: 0,
            root_position: Vec3::X * 10.0,
            tiles: vec![],
            boundary_corners: vec![],
            boundary_borders: vec![],
            area: 0.0,
            circumference: 0.0,
        };
        // On the equator, 10 units from the drift axis
        let v = plate.movement_at(Vec3::X * 10.0);
        assert!((v - Vec3::Y * 1.0).length() < 1e-5);
        // Points on the drift axis do not move
        assert!(plate.movement_at(Vec3::Z * 10.0).length() < 1e-6);

        let [r, g, b] = plate.color_rgb();
        assert!((r - 128.0 / 255.0).abs() < 1e-6);
        assert!((g - 1.0).abs() < 1e-6);
        assert_eq!(b, 0.0);
    }
}
