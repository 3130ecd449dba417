//! Tectonics, elevation and climate simulation
//!
//! [`generate_terrain`] runs every stage over a derived [`Topology`] in a
//! fixed order, drawing from a single random stream:
//!
//! 1. plate assignment
//! 2. boundary stress and elevation
//! 3. air currents, then ocean currents
//! 4. heat diffusion and temperature
//! 5. moisture diffusion and humidity
//! 6. biome classification

mod biome;
mod climate;
mod currents;
mod elevation;
mod plates;

pub use biome::{Biome, DRY, WET};
pub use climate::{assign_biomes, compute_humidity, compute_temperature};
pub use currents::{apply_air_currents, apply_ocean_currents, generate_air_whorls, generate_ocean_whorls, Whorl};
pub use elevation::{compute_elevation, Interaction};
pub use plates::{assign_plates, Plate};

use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PlanetError, Result};
use crate::topology::Topology;
use crate::util::{Stage, StageTimer};

/// Inputs of the terrain simulation
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSettings {
    /// Number of tectonic plates, at least 1 and fewer than the tile count
    pub plate_count: usize,
    /// Probability that a plate is oceanic, in `[0, 1]`
    pub oceanic_rate: f32,
    /// Heat released into the air per unit area
    pub heat_level: f32,
    /// Moisture released by the oceans per unit area
    pub moisture_level: f32,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            plate_count: 36,
            oceanic_rate: 0.7,
            heat_level: 1.0,
            moisture_level: 1.0,
        }
    }
}

impl TerrainSettings {
    /// Check the settings against a topology with `tile_count` tiles
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` describing the first invalid setting.
    pub fn validate(&self, tile_count: usize) -> Result<()> {
        if self.plate_count == 0 || self.plate_count >= tile_count {
            return Err(PlanetError::DegenerateInput(format!(
                "plate count must be between 1 and {} (got {})",
                tile_count.saturating_sub(1),
                self.plate_count
            )));
        }
        if !(0.0..=1.0).contains(&self.oceanic_rate) {
            return Err(PlanetError::DegenerateInput(format!(
                "oceanic rate must be within [0, 1] (got {})",
                self.oceanic_rate
            )));
        }
        for (name, level) in [("heat", self.heat_level), ("moisture", self.moisture_level)] {
            if !(level.is_finite() && level >= 0.0) {
                return Err(PlanetError::DegenerateInput(format!(
                    "{} level must be finite and non-negative (got {})",
                    name, level
                )));
            }
        }
        Ok(())
    }
}

/// Simulate plates, elevation and climate over `topology`
///
/// Fills every per-entity field of the topology and returns the plates.
///
/// # Errors
///
/// Returns `DegenerateInput` if the settings are invalid for this topology;
/// the topology is left untouched in that case.
pub fn generate_terrain<R: Rng>(
    topology: &mut Topology,
    settings: &TerrainSettings,
    rng: &mut R,
) -> Result<Vec<Plate>> {
    settings.validate(topology.tiles.len())?;
    let _t = StageTimer::start(Stage::Terrain);

    let mut plates = {
        let _t = StageTimer::start(Stage::Plates);
        assign_plates(topology, settings.plate_count, settings.oceanic_rate, rng)
    };

    {
        let _t = StageTimer::start(Stage::Elevation);
        compute_elevation(topology, &mut plates);
    }

    {
        let _t = StageTimer::start(Stage::Currents);
        let air = generate_air_whorls(rng);
        apply_air_currents(topology, &air);
        let ocean = generate_ocean_whorls(&plates, topology.radius, rng);
        apply_ocean_currents(topology, &ocean);
    }

    compute_temperature(topology, settings.heat_level);
    compute_humidity(topology, settings.moisture_level);
    assign_biomes(topology);

    let land = topology.tiles.iter().filter(|t| t.is_land()).count();
    log::info!(
        "Terrain: {} plates, {} of {} tiles above sea level",
        plates.len(),
        land,
        topology.tiles.len()
    );

    Ok(plates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_mesh;
    use crate::random::XorShift128;
    use crate::topology::derive_topology;

    fn topology(rng: &mut XorShift128) -> Topology {
        let mesh = build_mesh(8, 0.2, rng).unwrap();
        derive_topology(&mesh, 1000.0).unwrap()
    }

    #[test]
    fn test_settings_validation() {
        let ok = TerrainSettings::default();
        assert!(ok.validate(642).is_ok());
        assert!(ok.validate(36).is_err());

        let bad = [
            TerrainSettings { plate_count: 0, ..ok },
            TerrainSettings { oceanic_rate: 1.5, ..ok },
            TerrainSettings { oceanic_rate: -0.1, ..ok },
            TerrainSettings { heat_level: -1.0, ..ok },
            TerrainSettings { moisture_level: f32::NAN, ..ok },
        ];
        for settings in bad {
            assert!(matches!(settings.validate(642), Err(PlanetError::DegenerateInput(_))));
        }
    }

    #[test]
    fn test_invalid_settings_leave_topology_untouched() {
        let mut rng = XorShift128::new([1, 1, 1, 1]);
        let mut topology = topology(&mut rng);
        let before = topology.clone();
        let settings = TerrainSettings {
            plate_count: topology.tiles.len(),
            ..Default::default()
        };
        assert!(generate_terrain(&mut topology, &settings, &mut rng).is_err());
        assert_eq!(topology, before);
    }

    #[test]
    fn test_generate_terrain_fills_fields() {
        let mut rng = XorShift128::new([2, 7, 1, 8]);
        let mut topology = topology(&mut rng);
        let settings = TerrainSettings {
            plate_count: 12,
            ..Default::default()
        };
        let plates = generate_terrain(&mut topology, &settings, &mut rng).unwrap();
        assert_eq!(plates.len(), 12);
        for tile in &topology.tiles {
            assert!(tile.plate.is_some());
            assert!(tile.biome.is_some());
            assert!(tile.elevation.is_finite());
            assert!(tile.temperature.is_finite());
            assert!(tile.humidity.is_finite());
        }
    }

    #[test]
    fn test_generate_terrain_deterministic() {
        let run = || {
            let mut rng = XorShift128::new([6, 6, 6, 6]);
            let mut topology = topology(&mut rng);
            let settings = TerrainSettings {
                plate_count: 10,
                ..Default::default()
            };
            let plates = generate_terrain(&mut topology, &settings, &mut rng).unwrap();
            (topology, plates)
        };
        assert_eq!(run(), run());
    }
}
