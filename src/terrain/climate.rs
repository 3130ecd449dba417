//! Heat and moisture diffusion, temperature, humidity and biomes
//!
//! Both diffusions follow the same scheme: every corner starts with some
//! amount in the air above it, deposits part of it locally each round and
//! pushes the rest downstream along its outflow weights. Rounds continue
//! until the budget is spent or a round barely changes anything.

use super::biome::Biome;
use crate::topology::{HeatState, MoistureState, Topology};
use crate::util::{Stage, StageTimer};

/// A round consuming less than this fraction of the initial budget ends the diffusion
const MIN_ROUND_FRACTION: f32 = 1e-6;
const MAX_ROUNDS: usize = 10_000;
/// Fraction of saturation lost from absorbed heat per round
const HEAT_LOSS: f32 = 0.02;

/// Clamp a current speed into the range used to scale absorption
#[inline]
fn speed_factor(speed: f32) -> f32 {
    speed.clamp(0.1, 1.0)
}

/// Per-corner deposit behaviour of one diffusion
trait Diffusion {
    /// Amount currently in the air above `corner`
    fn air(&self, topology: &Topology, corner: usize) -> f32;
    fn set_air(&self, topology: &mut Topology, corner: usize, amount: f32);
    fn add_inflow(&self, topology: &mut Topology, corner: usize, amount: f32);
    /// Move arrived inflow into the air
    fn take_inflow(&self, topology: &mut Topology, corner: usize);
    /// Deposit locally from `air`; returns the amount consumed from the
    /// budget and the amount left to pass downstream
    fn deposit(&self, topology: &mut Topology, corner: usize, air: f32) -> (f32, f32);
    /// Downstream weights toward each neighbour
    fn outflows(&self, topology: &Topology, corner: usize) -> [f32; 3];
}

struct Heat;

impl Diffusion for Heat {
    fn air(&self, topology: &Topology, corner: usize) -> f32 {
        topology.corners[corner].heat.air
    }

    fn set_air(&self, topology: &mut Topology, corner: usize, amount: f32) {
        topology.corners[corner].heat.air = amount;
    }

    fn add_inflow(&self, topology: &mut Topology, corner: usize, amount: f32) {
        topology.corners[corner].heat.inflow += amount;
    }

    fn take_inflow(&self, topology: &mut Topology, corner: usize) {
        let heat = &mut topology.corners[corner].heat;
        heat.air += heat.inflow;
        heat.inflow = 0.0;
    }

    fn deposit(&self, topology: &mut Topology, corner: usize, air: f32) -> (f32, f32) {
        let c = &mut topology.corners[corner];
        let heat = &mut c.heat;
        let absorbed = heat.absorption.min(heat.limit - heat.current).clamp(0.0, air);
        heat.current += absorbed;
        let remaining = air - absorbed;
        let loss = if heat.limit > 0.0 {
            (c.area * heat.current / heat.limit * HEAT_LOSS).clamp(0.0, remaining)
        } else {
            0.0
        };
        (absorbed + loss, remaining - loss)
    }

    fn outflows(&self, topology: &Topology, corner: usize) -> [f32; 3] {
        let c = &topology.corners[corner];
        if c.water_outflows.iter().any(|&w| w > 0.0) {
            let mut mixed = [0.0; 3];
            for (slot, w) in mixed.iter_mut().enumerate() {
                *w = (c.air_outflows[slot] + c.water_outflows[slot]) / 2.0;
            }
            mixed
        } else {
            c.air_outflows
        }
    }
}

struct Moisture;

impl Diffusion for Moisture {
    fn air(&self, topology: &Topology, corner: usize) -> f32 {
        topology.corners[corner].moisture.air
    }

    fn set_air(&self, topology: &mut Topology, corner: usize, amount: f32) {
        topology.corners[corner].moisture.air = amount;
    }

    fn add_inflow(&self, topology: &mut Topology, corner: usize, amount: f32) {
        topology.corners[corner].moisture.inflow += amount;
    }

    fn take_inflow(&self, topology: &mut Topology, corner: usize) {
        let moisture = &mut topology.corners[corner].moisture;
        moisture.air += moisture.inflow;
        moisture.inflow = 0.0;
    }

    fn deposit(&self, topology: &mut Topology, corner: usize, air: f32) -> (f32, f32) {
        let moisture = &mut topology.corners[corner].moisture;
        let deposited = moisture
            .rate
            .min(moisture.limit - moisture.precipitation)
            .clamp(0.0, air);
        moisture.precipitation += deposited;
        (deposited, air - deposited)
    }

    fn outflows(&self, topology: &Topology, corner: usize) -> [f32; 3] {
        topology.corners[corner].air_outflows
    }
}

/// Run a diffusion to equilibrium, returning the number of rounds
fn diffuse<D: Diffusion>(topology: &mut Topology, diffusion: &D) -> usize {
    let corner_count = topology.corners.len();
    let budget: f32 = (0..corner_count).map(|c| diffusion.air(topology, c)).sum();
    if budget <= 0.0 {
        return 0;
    }

    let mut active: Vec<usize> = (0..corner_count).filter(|&c| diffusion.air(topology, c) > 0.0).collect();
    let mut queued = vec![false; corner_count];
    let mut remaining = budget;
    let mut rounds = 0;

    while !active.is_empty() && remaining > 0.0 && rounds < MAX_ROUNDS {
        rounds += 1;
        let mut consumed = 0.0;
        let mut touched: Vec<usize> = Vec::new();

        for &c in &active {
            let air = diffusion.air(topology, c);
            if air <= 0.0 {
                continue;
            }
            let (used, left) = diffusion.deposit(topology, c, air);
            consumed += used;

            let weights = diffusion.outflows(topology, c);
            let total: f32 = weights.iter().sum();
            if total > 0.0 && left > 0.0 {
                let neighbours = topology.corners[c].corners;
                for (slot, &n) in neighbours.iter().enumerate() {
                    if weights[slot] > 0.0 {
                        diffusion.add_inflow(topology, n, left * weights[slot] / total);
                        touched.push(n);
                    }
                }
                diffusion.set_air(topology, c, 0.0);
            } else {
                diffusion.set_air(topology, c, left);
                if left > 0.0 {
                    touched.push(c);
                }
            }
        }

        let mut next = Vec::with_capacity(touched.len());
        for c in touched {
            if queued[c] {
                continue;
            }
            diffusion.take_inflow(topology, c);
            if diffusion.air(topology, c) > 0.0 {
                queued[c] = true;
                next.push(c);
            }
        }
        for &c in &next {
            queued[c] = false;
        }
        active = next;

        remaining -= consumed;
        if consumed < budget * MIN_ROUND_FRACTION {
            break;
        }
    }

    rounds
}

/// Absorbed heat and temperature on every corner
pub fn compute_temperature(topology: &mut Topology, heat_level: f32) {
    let _t = StageTimer::start(Stage::Heat);

    for corner in &mut topology.corners {
        let speed = corner.air_current_speed + corner.water_current_speed;
        let mut absorption = 0.1 * corner.area / speed_factor(speed);
        if corner.is_land() {
            absorption *= 2.0;
        }
        corner.heat = HeatState {
            current: 0.0,
            absorption,
            limit: corner.area,
            air: corner.area * heat_level,
            inflow: 0.0,
        };
    }

    let rounds = diffuse(topology, &Heat);
    log::debug!("Heat diffusion settled after {} rounds", rounds);

    for corner in &mut topology.corners {
        let unit = corner.position.normalize_or_zero();
        let latitude = (1.0 - unit.y.abs()).max(0.0).sqrt();
        let elevation_effect = 1.0 - (corner.elevation * 0.8).clamp(0.0, 1.0).powi(2);
        let absorbed = if corner.area > 0.0 { corner.heat.current / corner.area } else { 0.0 };
        let blend = latitude * elevation_effect * 0.7 + absorbed * 0.3;
        corner.temperature = 2.0 * (blend * 5.0 / 3.0 - 2.0 / 3.0);
    }
}

/// Precipitation and humidity on every corner
///
/// Expects temperatures to be computed already.
pub fn compute_humidity(topology: &mut Topology, moisture_level: f32) {
    let _t = StageTimer::start(Stage::Moisture);

    for corner in &mut topology.corners {
        let cold = 1.0 - corner.temperature.clamp(0.0, 1.0);
        let mut rate = 0.0075 * corner.area / speed_factor(corner.air_current_speed) * (1.0 + 0.1 * cold);
        let (air, limit) = if corner.is_land() {
            rate *= 1.0 + 0.5 * corner.elevation;
            (0.0, corner.area * (0.25 + 0.25 * corner.elevation.clamp(0.0, 1.0)))
        } else {
            let warmth = (0.5 + 0.5 * corner.temperature).clamp(0.0, 1.0);
            (corner.area * moisture_level * warmth, corner.area * 0.25)
        };
        corner.moisture = MoistureState {
            air,
            inflow: 0.0,
            precipitation: 0.0,
            rate,
            limit,
        };
    }

    let rounds = diffuse(topology, &Moisture);
    log::debug!("Moisture diffusion settled after {} rounds", rounds);

    for corner in &mut topology.corners {
        corner.humidity = if corner.area > 0.0 {
            corner.moisture.precipitation / corner.area * 2.0
        } else {
            0.0
        };
    }
}

/// Average corner climate onto tiles and classify their biomes
pub fn assign_biomes(topology: &mut Topology) {
    for tile in &mut topology.tiles {
        let n = tile.corners.len().max(1) as f32;
        let (temperature, humidity) = tile.corners.iter().fold((0.0, 0.0), |(t, h), &c| {
            let corner = &topology.corners[c];
            (t + corner.temperature, h + corner.humidity)
        });
        tile.temperature = temperature / n;
        tile.humidity = humidity / n;
        tile.biome = Some(Biome::classify(tile.elevation, tile.temperature, tile.humidity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_mesh;
    use crate::random::XorShift128;
    use crate::terrain::currents::{apply_air_currents, generate_air_whorls};
    use crate::topology::derive_topology;

    fn topology_with_air() -> Topology {
        let mut rng = XorShift128::new([41, 42, 43, 44]);
        let mesh = build_mesh(6, 0.1, &mut rng).unwrap();
        let mut topology = derive_topology(&mesh, 1000.0).unwrap();
        for corner in &mut topology.corners {
            corner.elevation = if corner.position.z > 300.0 { 0.4 } else { -0.4 };
        }
        let whorls = generate_air_whorls(&mut rng);
        apply_air_currents(&mut topology, &whorls);
        topology
    }

    #[test]
    fn test_heat_respects_limits() {
        let mut topology = topology_with_air();
        compute_temperature(&mut topology, 1.0);
        for corner in &topology.corners {
            assert!(corner.heat.current >= 0.0);
            assert!(corner.heat.current <= corner.heat.limit * 1.0001);
            assert!(corner.temperature.is_finite());
            assert!(corner.temperature >= -4.0 / 3.0 - 1e-4);
            assert!(corner.temperature <= 2.0 + 1e-4);
        }
    }

    #[test]
    fn test_equator_warmer_than_poles() {
        let mut topology = topology_with_air();
        compute_temperature(&mut topology, 1.0);
        let mean = |filter: &dyn Fn(f32) -> bool| {
            let selected: Vec<f32> = topology
                .corners
                .iter()
                .filter(|c| filter(c.position.y / 1000.0))
                .map(|c| c.temperature)
                .collect();
            selected.iter().sum::<f32>() / selected.len() as f32
        };
        let equator = mean(&|y| y.abs() < 0.2);
        let poles = mean(&|y| y.abs() > 0.9);
        assert!(equator > poles);
    }

    #[test]
    fn test_zero_heat_level() {
        let mut topology = topology_with_air();
        compute_temperature(&mut topology, 0.0);
        for corner in &topology.corners {
            assert_eq!(corner.heat.current, 0.0);
        }
    }

    #[test]
    fn test_moisture_bounded_by_limit() {
        let mut topology = topology_with_air();
        compute_temperature(&mut topology, 1.0);
        compute_humidity(&mut topology, 1.0);
        for corner in &topology.corners {
            assert!(corner.moisture.precipitation >= 0.0);
            assert!(corner.moisture.precipitation <= corner.moisture.limit * 1.0001);
            assert!(corner.humidity >= 0.0 && corner.humidity.is_finite());
        }
        assert!(topology.corners.iter().any(|c| c.humidity > 0.0));
    }

    #[test]
    fn test_biomes_assigned() {
        let mut topology = topology_with_air();
        compute_temperature(&mut topology, 1.0);
        compute_humidity(&mut topology, 1.0);
        for tile in &mut topology.tiles {
            let sum: f32 = tile.corners.iter().map(|&c| topology.corners[c].elevation).sum();
            tile.elevation = sum / tile.corners.len() as f32;
        }
        assign_biomes(&mut topology);
        for tile in &topology.tiles {
            let biome = tile.biome.unwrap();
            assert_eq!(biome, Biome::classify(tile.elevation, tile.temperature, tile.humidity));
        }
    }
}
