//! Planet: the whole pipeline behind one structure

use std::collections::BTreeMap;

use crate::config::PlanetConfig;
use crate::error::{PlanetError, Result};
use crate::mesh::build_mesh_with_options;
use crate::random::XorShift128;
use crate::terrain::{generate_terrain, Biome, Plate};
use crate::topology::{derive_topology, Border, Corner, Tile, Topology};
use crate::util::{Stage, StageTimer};

#[cfg(feature = "spatial-index")]
use crate::spatial::SpatialIndex;
#[cfg(feature = "spatial-index")]
use glam::Vec3;

/// A fully generated planet
///
/// Owns the derived topology with every climate field filled in, plus the
/// tectonic plates. All queries are by tile id.
///
/// # Examples
///
/// ```
/// use icosphere_planet::*;
///
/// let config = PlanetConfigBuilder::new()
///     .seed([42, 0, 0, 0])
///     .planet_size(PlanetSize::Tiny)
///     .plate_count(16)
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let planet = Planet::generate(config).unwrap();
/// assert_eq!(planet.tile_count(), 1_002);
///
/// let tile = planet.tile(0).unwrap();
/// println!("Tile 0 is {:?}", tile.biome);
/// ```
#[derive(Clone)]
pub struct Planet {
    config: PlanetConfig,
    topology: Topology,
    plates: Vec<Plate>,
    #[cfg(feature = "spatial-index")]
    spatial_index: SpatialIndex,
}

impl Planet {
    /// Run mesh building, topology derivation and the terrain simulation
    ///
    /// The random stream is seeded from `config.seed`, so the same
    /// configuration always yields the same planet.
    ///
    /// # Errors
    ///
    /// Returns `DegenerateInput` for invalid settings and
    /// `StructuralInvariantBroken` if the mesh cannot be turned into a
    /// consistent topology.
    pub fn generate(config: PlanetConfig) -> Result<Self> {
        let _t = StageTimer::start(Stage::Planet);
        let mut rng = XorShift128::new(config.seed);

        let mesh = build_mesh_with_options(config.degree(), config.distortion, config.relax, &mut rng)?;
        let mut topology = derive_topology(&mesh, config.radius())?;
        let plates = generate_terrain(&mut topology, &config.terrain, &mut rng)?;

        #[cfg(feature = "spatial-index")]
        let spatial_index = SpatialIndex::new(&topology);

        log::info!(
            "Generated {} planet: {} tiles, {} plates",
            config.planet_size.name(),
            topology.tiles.len(),
            plates.len()
        );

        Ok(Self {
            config,
            topology,
            plates,
            #[cfg(feature = "spatial-index")]
            spatial_index,
        })
    }

    /// Configuration used to generate this planet
    #[inline]
    pub fn config(&self) -> &PlanetConfig {
        &self.config
    }

    /// The full tile, corner and border topology
    #[inline]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.topology.tiles.len()
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.topology.radius
    }

    /// Get a tile by id
    ///
    /// # Errors
    ///
    /// Returns `TileNotFound` if `id` is out of bounds
    pub fn tile(&self, id: usize) -> Result<&Tile> {
        self.topology.tiles.get(id).ok_or(PlanetError::TileNotFound(id))
    }

    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.topology.tiles
    }

    #[inline]
    pub fn corners(&self) -> &[Corner] {
        &self.topology.corners
    }

    #[inline]
    pub fn borders(&self) -> &[Border] {
        &self.topology.borders
    }

    #[inline]
    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    /// Neighbour ids of a tile, in boundary order
    ///
    /// Returns an empty slice if `id` is invalid.
    pub fn neighbors(&self, id: usize) -> &[usize] {
        self.topology
            .tiles
            .get(id)
            .map(|t| t.tiles.as_slice())
            .unwrap_or(&[])
    }

    /// Id of the tile under `position` (requires the spatial-index feature)
    ///
    /// # Example
    ///
    /// ```
    /// # use icosphere_planet::*;
    /// # let config = PlanetConfigBuilder::new()
    /// #     .seed([1, 2, 3, 4])
    /// #     .planet_size(PlanetSize::Tiny)
    /// #     .build()
    /// #     .unwrap();
    /// # let planet = Planet::generate(config).unwrap();
    /// let id = planet.find_tile_at(Vec3::new(planet.radius(), 0.0, 0.0));
    /// println!("Position is in tile {}", id);
    /// ```
    #[cfg(feature = "spatial-index")]
    pub fn find_tile_at(&self, position: Vec3) -> usize {
        self.spatial_index.find_nearest(position)
    }

    /// Tiles reachable within `hops` steps of `center` (BFS)
    ///
    /// The result starts with `center` and is in breadth-first order.
    /// Returns an empty vec if `center` is invalid.
    pub fn find_tiles_within_hops(&self, center: usize, hops: usize) -> Vec<usize> {
        if center >= self.tile_count() {
            return vec![];
        }

        let mut visited = vec![false; self.tile_count()];
        visited[center] = true;
        let mut found = vec![center];
        let mut frontier = 0;

        for _ in 0..hops {
            let end = found.len();
            for i in frontier..end {
                for &n in self.neighbors(found[i]) {
                    if !visited[n] {
                        visited[n] = true;
                        found.push(n);
                    }
                }
            }
            if found.len() == end {
                break;
            }
            frontier = end;
        }

        found
    }

    /// Number of tiles per biome
    pub fn biome_histogram(&self) -> BTreeMap<Biome, usize> {
        let mut counts = BTreeMap::new();
        for biome in self.topology.tiles.iter().filter_map(|t| t.biome) {
            *counts.entry(biome).or_insert(0) += 1;
        }
        counts
    }
}
