//! Air and ocean currents built from whorls
//!
//! A whorl is a circular vortex on the sphere. Currents at a corner are the
//! weighted sum of the tangential velocities of every whorl covering it.
//! Whorl geometry is expressed on the unit sphere (radii in radians) and
//! speeds at a fixed reference radius, so currents do not depend on the
//! planet's size.

use std::f32::consts::PI;

use glam::{Quat, Vec3};
use rand::Rng;

use super::plates::Plate;
use crate::topology::Topology;

/// Radius at which whorl strengths are converted into speeds
const REFERENCE_RADIUS: f32 = 1000.0;
/// Strength of the push away from land on coastal ocean corners
const COAST_REPULSION: f32 = 2.0;

/// A circular current centred on the sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Whorl {
    /// Unit centre
    pub center: Vec3,
    /// Signed angular strength; the sign selects the spin direction
    pub strength: f32,
    /// Angular radius of influence
    pub radius: f32,
}

impl Whorl {
    /// Velocity contribution and weight at unit position `p`, if covered
    fn contribution(&self, p: Vec3) -> Option<(Vec3, f32)> {
        let angle = self.center.dot(p).clamp(-1.0, 1.0).acos();
        if angle >= self.radius {
            return None;
        }
        let normalized = angle / self.radius;
        let weight = 1.0 - normalized;
        let speed = REFERENCE_RADIUS * self.strength * weight * normalized;
        Some((self.center.cross(p).normalize_or_zero() * speed, weight))
    }
}

/// Sum of whorl velocities at `p`, normalised by total weight
fn whorl_current(whorls: &[Whorl], p: Vec3) -> Vec3 {
    let (sum, weight) = whorls
        .iter()
        .filter_map(|w| w.contribution(p))
        .fold((Vec3::ZERO, 0.0), |(v, w), (dv, dw)| (v + dv, w + dw));
    if weight > 0.0 {
        sum / weight
    } else {
        Vec3::ZERO
    }
}

/// Random spin direction, `1` or `-1`
fn random_direction<R: Rng>(rng: &mut R) -> f32 {
    if rng.gen_range(0..=1) == 1 {
        1.0
    } else {
        -1.0
    }
}

/// North pole tilted by a small random angle, then spun to a random longitude
fn jittered_pole<R: Rng>(rng: &mut R, max_tilt: f32) -> Vec3 {
    let tilt = rng.gen_range(0.0..=max_tilt);
    let spin = rng.gen_range(0.0..2.0 * PI);
    Quat::from_rotation_y(spin) * (Quat::from_rotation_x(tilt) * Vec3::Y)
}

/// Latitude bands of alternating whorls
///
/// 4 to 7 layers: a polar whorl at each end, and middle layers ringed by
/// enough whorls to cover their circumference.
pub fn generate_air_whorls<R: Rng>(rng: &mut R) -> Vec<Whorl> {
    let full = 2.0 * PI;
    let mut direction = random_direction(rng);
    let layer_count: usize = rng.gen_range(4..=7);
    let base_radius = full / (2.0 * (layer_count - 1) as f32);
    let max_tilt = full / (2.0 * (layer_count + 4) as f32);

    let mut whorls = Vec::new();

    let center = jittered_pole(rng, max_tilt);
    whorls.push(Whorl {
        center,
        strength: rng.gen_range(full / 36.0..=full / 24.0) * direction,
        radius: rng.gen_range(base_radius * 0.8..=base_radius * 1.2),
    });

    for i in 1..layer_count - 1 {
        direction = -direction;
        let base_tilt = i as f32 / (layer_count - 1) as f32 * full / 2.0;
        let count = (base_tilt.sin() * full / base_radius).ceil() as usize;
        for j in 0..count {
            let jitter = jittered_pole(rng, max_tilt);
            let offset = full * (j as f32 + (i % 2) as f32 / 2.0) / count as f32;
            let center = Quat::from_rotation_y(offset) * (Quat::from_rotation_x(base_tilt) * jitter);
            whorls.push(Whorl {
                center,
                strength: rng.gen_range(full / 48.0..=full / 32.0) * direction,
                radius: rng.gen_range(base_radius * 0.8..=base_radius * 1.2),
            });
        }
    }

    direction = -direction;
    let center = Quat::from_rotation_x(full / 2.0) * jittered_pole(rng, max_tilt);
    whorls.push(Whorl {
        center,
        strength: rng.gen_range(full / 36.0..=full / 24.0) * direction,
        radius: rng.gen_range(base_radius * 0.8..=base_radius * 1.2),
    });

    whorls
}

/// One weak whorl per oceanic plate, centred on its root
pub fn generate_ocean_whorls<R: Rng>(plates: &[Plate], radius: f32, rng: &mut R) -> Vec<Whorl> {
    plates
        .iter()
        .filter(|plate| plate.oceanic)
        .map(|plate| {
            let direction = random_direction(rng);
            let strength = rng.gen_range(PI / 96.0..=PI / 64.0) * direction;
            let solid_angle = plate.area / (radius * radius);
            Whorl {
                center: plate.root_position.normalize_or_zero(),
                strength,
                radius: (solid_angle / PI).sqrt() * 1.2,
            }
        })
        .collect()
}

/// Outflow weights toward each neighbour: positive alignment with
/// `direction`, normalised to sum to one
fn outflows(topology: &Topology, corner: usize, direction: Vec3, allowed: impl Fn(usize) -> bool) -> [f32; 3] {
    let c = &topology.corners[corner];
    let mut weights = [0.0; 3];
    let mut sum = 0.0;
    for (slot, &n) in c.corners.iter().enumerate() {
        if !allowed(n) {
            continue;
        }
        let toward = (topology.corners[n].position - c.position).normalize_or_zero();
        let dot = toward.dot(direction);
        if dot > 0.0 {
            weights[slot] = dot;
            sum += dot;
        }
    }
    if sum > 0.0 {
        for w in &mut weights {
            *w /= sum;
        }
    }
    weights
}

/// Fill air current, speed and outflows on every corner
pub fn apply_air_currents(topology: &mut Topology, whorls: &[Whorl]) {
    let currents: Vec<Vec3> = topology
        .corners
        .iter()
        .map(|c| whorl_current(whorls, c.position.normalize_or_zero()))
        .collect();

    for (i, current) in currents.into_iter().enumerate() {
        let weights = outflows(topology, i, current.normalize_or_zero(), |_| true);
        let corner = &mut topology.corners[i];
        corner.air_current = current;
        corner.air_current_speed = current.length();
        corner.air_outflows = weights;
    }
}

/// Whorl current at an ocean corner plus a push away from each land neighbour
fn coastal_current(topology: &Topology, corner: usize, whorls: &[Whorl]) -> Vec3 {
    let c = &topology.corners[corner];
    if c.is_land() {
        return Vec3::ZERO;
    }
    let p = c.position.normalize_or_zero();
    let mut current = whorl_current(whorls, p);
    for &n in &c.corners {
        let neighbour = &topology.corners[n];
        if neighbour.is_land() {
            let away = (c.position - neighbour.position).normalize_or_zero();
            let tangent = away - p * p.dot(away);
            current += tangent.normalize_or_zero() * COAST_REPULSION;
        }
    }
    current
}

/// Fill water current, speed and outflows on every ocean corner
///
/// Land corners get no current. Coastal corners are pushed away from land
/// and outflows follow that unsmoothed current. The stored current is then
/// smoothed once with the ocean neighbours.
pub fn apply_ocean_currents(topology: &mut Topology, whorls: &[Whorl]) {
    let raw: Vec<Vec3> = (0..topology.corners.len())
        .map(|i| coastal_current(topology, i, whorls))
        .collect();

    let land: Vec<bool> = topology.corners.iter().map(|c| c.is_land()).collect();
    let weights: Vec<[f32; 3]> = raw
        .iter()
        .enumerate()
        .map(|(i, current)| {
            if land[i] {
                [0.0; 3]
            } else {
                outflows(topology, i, current.normalize_or_zero(), |n| !land[n])
            }
        })
        .collect();

    let smoothed: Vec<Vec3> = topology
        .corners
        .iter()
        .map(|c| {
            if land[c.id] {
                return Vec3::ZERO;
            }
            let mut sum = raw[c.id];
            let mut count = 1.0;
            for &n in &c.corners {
                if !land[n] {
                    sum += raw[n];
                    count += 1.0;
                }
            }
            sum / count
        })
        .collect();

    for (corner, (current, weights)) in topology.corners.iter_mut().zip(smoothed.into_iter().zip(weights)) {
        corner.water_current = current;
        corner.water_current_speed = current.length();
        corner.water_outflows = weights;
    }
}
