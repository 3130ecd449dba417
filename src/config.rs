//! Planet configuration and builder
//!
//! A [`PlanetConfig`] fully determines a planet: the same configuration
//! always regenerates the identical mesh, topology and climate.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PlanetError, Result};
use crate::mesh::RelaxOptions;
use crate::terrain::TerrainSettings;

/// Radius shared by the size presets
const PRESET_RADIUS: f32 = 1000.0;
const DEFAULT_DISTORTION: f32 = 0.05;

/// Planet size presets
///
/// Each preset fixes the icosahedron subdivision degree, which sets the tile
/// count to `10 * degree^2 + 2`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanetSize {
    /// Degree 10: 1,002 tiles
    Tiny,
    /// Degree 20: 4,002 tiles
    Small,
    /// Degree 40: 16,002 tiles
    Medium,
    /// Degree 60: 36,002 tiles
    Large,
    /// Custom degree and radius
    Custom {
        /// Segments each icosahedron edge is split into
        degree: usize,
        /// Sphere radius in world units
        radius: f32,
    },
}

impl PlanetSize {
    /// Subdivision degree of this size
    pub fn degree(self) -> usize {
        match self {
            PlanetSize::Tiny => 10,
            PlanetSize::Small => 20,
            PlanetSize::Medium => 40,
            PlanetSize::Large => 60,
            PlanetSize::Custom { degree, .. } => degree,
        }
    }

    /// Sphere radius of this size
    pub fn radius(self) -> f32 {
        match self {
            PlanetSize::Custom { radius, .. } => radius,
            _ => PRESET_RADIUS,
        }
    }

    /// Number of tiles a planet of this size has
    pub fn tile_count(self) -> usize {
        let d = self.degree();
        10 * d * d + 2
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            PlanetSize::Tiny => "Tiny",
            PlanetSize::Small => "Small",
            PlanetSize::Medium => "Medium",
            PlanetSize::Large => "Large",
            PlanetSize::Custom { .. } => "Custom",
        }
    }
}

impl Default for PlanetSize {
    fn default() -> Self {
        PlanetSize::Medium
    }
}

/// Configuration for deterministic planet generation
///
/// Only the configuration needs to be stored or shared; the planet is
/// regenerated from it.
///
/// # Example
///
/// ```rust
/// use icosphere_planet::*;
///
/// let config = PlanetConfigBuilder::new()
///     .seed([1, 2, 3, 4])
///     .planet_size(PlanetSize::Tiny)
///     .plate_count(12)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(config.degree(), 10);
/// assert_eq!(config.terrain.plate_count, 12);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetConfig {
    /// Seed words of the random stream
    pub seed: [u32; 4],
    /// Size preset (subdivision degree and radius)
    pub planet_size: PlanetSize,
    /// Fraction of mesh edges to rotate, in `[0, 1]`
    pub distortion: f32,
    /// Radius used instead of the preset radius, if set
    pub radius_override: Option<f32>,
    /// Mesh relaxation settings
    pub relax: RelaxOptions,
    /// Plates and climate settings
    pub terrain: TerrainSettings,
}

impl PlanetConfig {
    /// Subdivision degree for this configuration
    #[inline]
    pub fn degree(&self) -> usize {
        self.planet_size.degree()
    }

    /// Sphere radius, honouring the override
    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius_override.unwrap_or_else(|| self.planet_size.radius())
    }

    /// Number of tiles the generated planet will have
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.planet_size.tile_count()
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            seed: rand::random(),
            planet_size: PlanetSize::default(),
            distortion: DEFAULT_DISTORTION,
            radius_override: None,
            relax: RelaxOptions::default(),
            terrain: TerrainSettings::default(),
        }
    }
}

/// Builder for [`PlanetConfig`] with validation
///
/// Setters whose value can be out of range return `Result<Self>`; checks
/// that depend on several settings run in [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use icosphere_planet::*;
///
/// // Defaults with a random seed
/// let config = PlanetConfigBuilder::new().build().unwrap();
/// assert_eq!(config.planet_size, PlanetSize::Medium);
///
/// // Customised
/// let config = PlanetConfigBuilder::new()
///     .seed([7, 7, 7, 7])
///     .planet_size(PlanetSize::Small)
///     .distortion(0.1)
///     .unwrap()
///     .oceanic_rate(0.5)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(config.terrain.oceanic_rate, 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct PlanetConfigBuilder {
    seed: Option<[u32; 4]>,
    planet_size: PlanetSize,
    distortion: f32,
    radius_override: Option<f32>,
    relax: RelaxOptions,
    terrain: TerrainSettings,
}

impl PlanetConfigBuilder {
    /// Create a builder with default values
    ///
    /// Defaults:
    /// - seed: random
    /// - planet_size: Medium (16,002 tiles)
    /// - distortion: 0.05
    /// - 36 plates, 70% oceanic, heat and moisture levels of 1
    pub fn new() -> Self {
        Self {
            seed: None,
            planet_size: PlanetSize::default(),
            distortion: DEFAULT_DISTORTION,
            radius_override: None,
            relax: RelaxOptions::default(),
            terrain: TerrainSettings::default(),
        }
    }

    /// Set the seed words of the random stream
    pub fn seed(mut self, seed: [u32; 4]) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the planet size preset
    pub fn planet_size(mut self, size: PlanetSize) -> Self {
        self.planet_size = size;
        self
    }

    /// Set the fraction of mesh edges to rotate
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if `distortion` is outside `[0, 1]`
    pub fn distortion(mut self, distortion: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&distortion) {
            return Err(PlanetError::DegenerateInput(format!(
                "distortion must be within [0, 1] (got {})",
                distortion
            )));
        }
        self.distortion = distortion;
        Ok(self)
    }

    /// Override the sphere radius
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if `radius` is not finite and positive
    pub fn radius_override(mut self, radius: f32) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PlanetError::DegenerateInput(format!(
                "radius override must be positive (got {})",
                radius
            )));
        }
        self.radius_override = Some(radius);
        Ok(self)
    }

    /// Set the relaxation options
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if the multiplier or the convergence
    /// divisor is not finite and positive
    pub fn relax(mut self, relax: RelaxOptions) -> Result<Self> {
        if !(relax.multiplier.is_finite() && relax.multiplier > 0.0)
            || !(relax.convergence_divisor.is_finite() && relax.convergence_divisor > 0.0)
        {
            return Err(PlanetError::DegenerateInput(format!(
                "relaxation multiplier and divisor must be positive (got {} and {})",
                relax.multiplier, relax.convergence_divisor
            )));
        }
        self.relax = relax;
        Ok(self)
    }

    /// Set the number of tectonic plates
    ///
    /// The upper bound depends on the planet size and is checked by
    /// [`build`](Self::build).
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if `count` is zero
    pub fn plate_count(mut self, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(PlanetError::DegenerateInput(
                "plate count must be at least 1".to_string(),
            ));
        }
        self.terrain.plate_count = count;
        Ok(self)
    }

    /// Set the probability that a plate is oceanic
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if `rate` is outside `[0, 1]`
    pub fn oceanic_rate(mut self, rate: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(PlanetError::DegenerateInput(format!(
                "oceanic rate must be within [0, 1] (got {})",
                rate
            )));
        }
        self.terrain.oceanic_rate = rate;
        Ok(self)
    }

    /// Set the heat level
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if `level` is negative or not finite
    pub fn heat_level(mut self, level: f32) -> Result<Self> {
        self.terrain.heat_level = non_negative("heat", level)?;
        Ok(self)
    }

    /// Set the moisture level
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` if `level` is negative or not finite
    pub fn moisture_level(mut self, level: f32) -> Result<Self> {
        self.terrain.moisture_level = non_negative("moisture", level)?;
        Ok(self)
    }

    /// Build the configuration
    ///
    /// Draws a random seed if none was provided.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` for a zero degree, a non-positive custom
    /// radius, or a plate count not below the tile count.
    pub fn build(self) -> Result<PlanetConfig> {
        if self.planet_size.degree() < 1 {
            return Err(PlanetError::DegenerateInput(
                "subdivision degree must be >= 1".to_string(),
            ));
        }
        let radius = self.radius_override.unwrap_or_else(|| self.planet_size.radius());
        if !(radius.is_finite() && radius > 0.0) {
            return Err(PlanetError::DegenerateInput(format!(
                "radius must be positive (got {})",
                radius
            )));
        }
        self.terrain.validate(self.planet_size.tile_count())?;

        Ok(PlanetConfig {
            seed: self.seed.unwrap_or_else(rand::random),
            planet_size: self.planet_size,
            distortion: self.distortion,
            radius_override: self.radius_override,
            relax: self.relax,
            terrain: self.terrain,
        })
    }
}

impl Default for PlanetConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn non_negative(name: &str, level: f32) -> Result<f32> {
    if level.is_finite() && level >= 0.0 {
        Ok(level)
    } else {
        Err(PlanetError::DegenerateInput(format!(
            "{} level must be finite and non-negative (got {})",
            name, level
        )))
    }
}
