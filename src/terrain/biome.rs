//! Biome classification

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Humidity below which land counts as dry
pub const DRY: f32 = 0.51;
/// Humidity at or above which land counts as wet
pub const WET: f32 = 0.67;

/// Surface biome of a tile
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Biome {
    Ocean,
    OceanGlacier,
    Desert,
    RainForest,
    Rocky,
    Plains,
    Grassland,
    Swamp,
    DeciduousForest,
    Tundra,
    LandGlacier,
    ConiferForest,
    Snow,
    Mountain,
    SnowyMountain,
}

impl Biome {
    /// Every biome, in declaration order
    pub const ALL: [Biome; 15] = [
        Biome::Ocean,
        Biome::OceanGlacier,
        Biome::Desert,
        Biome::RainForest,
        Biome::Rocky,
        Biome::Plains,
        Biome::Grassland,
        Biome::Swamp,
        Biome::DeciduousForest,
        Biome::Tundra,
        Biome::LandGlacier,
        Biome::ConiferForest,
        Biome::Snow,
        Biome::Mountain,
        Biome::SnowyMountain,
    ];

    /// Classify a surface from elevation, temperature and humidity
    ///
    /// ```
    /// use icosphere_planet::Biome;
    ///
    /// assert_eq!(Biome::classify(-0.2, 0.4, 0.0), Biome::Ocean);
    /// assert_eq!(Biome::classify(0.3, 0.9, 0.2), Biome::Desert);
    /// assert_eq!(Biome::classify(0.9, -0.1, 0.8), Biome::SnowyMountain);
    /// ```
    pub fn classify(elevation: f32, temperature: f32, humidity: f32) -> Biome {
        if elevation <= 0.0 {
            if temperature > 0.0 {
                Biome::Ocean
            } else {
                Biome::OceanGlacier
            }
        } else if elevation < 0.6 {
            if temperature > 0.75 {
                if humidity < DRY {
                    Biome::Desert
                } else {
                    Biome::RainForest
                }
            } else if temperature > 0.5 {
                if humidity < DRY {
                    Biome::Rocky
                } else if humidity < WET {
                    Biome::Plains
                } else {
                    Biome::Swamp
                }
            } else if temperature > 0.0 {
                if humidity < DRY {
                    Biome::Plains
                } else if humidity < WET {
                    Biome::Grassland
                } else {
                    Biome::DeciduousForest
                }
            } else if humidity < DRY {
                Biome::Tundra
            } else {
                Biome::LandGlacier
            }
        } else if elevation <= 0.8 {
            if temperature > 0.0 {
                if humidity < DRY {
                    Biome::Tundra
                } else {
                    Biome::ConiferForest
                }
            } else {
                Biome::Snow
            }
        } else if temperature > 0.0 || humidity < DRY {
            Biome::Mountain
        } else {
            Biome::SnowyMountain
        }
    }

    /// Whether the biome lies below sea level
    pub fn is_water(self) -> bool {
        matches!(self, Biome::Ocean | Biome::OceanGlacier)
    }

    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Biome::Ocean => "ocean",
            Biome::OceanGlacier => "ocean glacier",
            Biome::Desert => "desert",
            Biome::RainForest => "rain forest",
            Biome::Rocky => "rocky",
            Biome::Plains => "plains",
            Biome::Grassland => "grassland",
            Biome::Swamp => "swamp",
            Biome::DeciduousForest => "deciduous forest",
            Biome::Tundra => "tundra",
            Biome::LandGlacier => "land glacier",
            Biome::ConiferForest => "conifer forest",
            Biome::Snow => "snow",
            Biome::Mountain => "mountain",
            Biome::SnowyMountain => "snowy mountain",
        }
    }

    /// Preview colour as RGB bytes
    pub fn preview_rgb(self) -> [u8; 3] {
        match self {
            Biome::Ocean => [0x00, 0x33, 0x99],
            Biome::OceanGlacier => [0xdd, 0xee, 0xff],
            Biome::Desert => [0xdd, 0xdd, 0x77],
            Biome::RainForest => [0x44, 0xdd, 0x00],
            Biome::Rocky => [0xaa, 0x99, 0x77],
            Biome::Plains => [0x99, 0xbb, 0x44],
            Biome::Grassland => [0x77, 0xcc, 0x44],
            Biome::Swamp => [0x77, 0x66, 0x44],
            Biome::DeciduousForest => [0x33, 0xaa, 0x22],
            Biome::Tundra => [0x99, 0xaa, 0x99],
            Biome::LandGlacier => [0xee, 0xee, 0xff],
            Biome::ConiferForest => [0x22, 0x66, 0x33],
            Biome::Snow => [0xff, 0xff, 0xff],
            Biome::Mountain => [0x88, 0x88, 0x88],
            Biome::SnowyMountain => [0xcc, 0xcc, 0xcc],
        }
    }
}

impl std::fmt::Display for Biome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
