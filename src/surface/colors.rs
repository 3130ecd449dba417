//! Color mapping for tiles

use crate::terrain::{Biome, Plate};
use crate::topology::Tile;

/// RGBA color type
pub type TileColor = [f32; 4];

/// Trait for mapping tiles to colors
pub trait TileColorMapper {
    /// Map a tile to an RGBA color
    fn map_color(&self, tile: &Tile) -> TileColor;
}

/// Colors tiles by biome
///
/// Tiles without a biome get `fallback`.
#[derive(Debug, Clone, Copy)]
pub struct BiomeColorMapper {
    pub fallback: TileColor,
}

impl Default for BiomeColorMapper {
    fn default() -> Self {
        Self {
            fallback: [0.5, 0.5, 0.5, 1.0],
        }
    }
}

impl BiomeColorMapper {
    /// Preview color of a biome
    pub fn biome_color(biome: Biome) -> TileColor {
        let [r, g, b] = biome.preview_rgb();
        [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0]
    }
}

impl TileColorMapper for BiomeColorMapper {
    fn map_color(&self, tile: &Tile) -> TileColor {
        tile.biome.map_or(self.fallback, Self::biome_color)
    }
}

/// Colors tiles on a gradient by elevation
///
/// Water runs from `deep` to `shallow`, land from `lowland` to `peak`;
/// elevations saturate at `-1` and `1`.
#[derive(Debug, Clone)]
pub struct ElevationColorMapper {
    pub deep: TileColor,
    pub shallow: TileColor,
    pub lowland: TileColor,
    pub peak: TileColor,
}

impl Default for ElevationColorMapper {
    fn default() -> Self {
        Self {
            deep: [0.0, 0.05, 0.3, 1.0],
            shallow: [0.2, 0.45, 0.8, 1.0],
            lowland: [0.25, 0.55, 0.2, 1.0],
            peak: [0.95, 0.95, 0.95, 1.0],
        }
    }
}

impl TileColorMapper for ElevationColorMapper {
    fn map_color(&self, tile: &Tile) -> TileColor {
        let e = tile.elevation.clamp(-1.0, 1.0);
        if e > 0.0 {
            lerp(self.lowland, self.peak, e)
        } else {
            lerp(self.shallow, self.deep, -e)
        }
    }
}

/// Colors tiles by the color of their tectonic plate
#[derive(Debug, Clone)]
pub struct PlateColorMapper {
    colors: Vec<TileColor>,
    /// Color of tiles without a plate
    pub fallback: TileColor,
}

impl PlateColorMapper {
    /// Build a mapper from the planet's plates
    pub fn new(plates: &[Plate]) -> Self {
        Self {
            colors: plates
                .iter()
                .map(|p| {
                    let [r, g, b] = p.color_rgb();
                    [r, g, b, 1.0]
                })
                .collect(),
            fallback: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl TileColorMapper for PlateColorMapper {
    fn map_color(&self, tile: &Tile) -> TileColor {
        tile.plate
            .and_then(|p| self.colors.get(p).copied())
            .unwrap_or(self.fallback)
    }
}

fn lerp(a: TileColor, b: TileColor, t: f32) -> TileColor {
    let mut out = a;
    for (o, (x, y)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *o = x + (y - x) * t;
    }
    out
}
