//! Icosphere-based planet generation
//!
//! Builds a distorted, relaxed icosphere mesh, derives its dual tile
//! topology, then simulates tectonic plates, elevation, currents, heat and
//! moisture to assign a biome to every tile. Everything is deterministic for
//! a given seed.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use icosphere_planet::*;
//!
//! let config = PlanetConfigBuilder::new()
//!     .seed([1, 2, 3, 4])
//!     .planet_size(PlanetSize::Small)
//!     .plate_count(24).unwrap()
//!     .build().unwrap();
//!
//! let planet = Planet::generate(config).unwrap();
//! for (biome, count) in planet.biome_histogram() {
//!     println!("{biome}: {count}");
//! }
//!
//! // Render data
//! let mesh = generate_surface(planet.topology(), &BiomeColorMapper::default());
//! println!("Generated {} triangles", mesh.triangle_count());
//! ```
//!
//! The stages can also be driven one by one:
//!
//! ```rust
//! use icosphere_planet::*;
//!
//! let mut rng = XorShift128::new([5, 6, 7, 8]);
//! let mesh = build_mesh(6, 0.1, &mut rng).unwrap();
//! let mut topology = derive_topology(&mesh, 1000.0).unwrap();
//! let settings = TerrainSettings { plate_count: 8, ..Default::default() };
//! let plates = generate_terrain(&mut topology, &settings, &mut rng).unwrap();
//! assert_eq!(plates.len(), 8);
//! ```
//!
//! # Features
//!
//! - `spatial-index` (default): O(log n) position-to-tile lookups using a KD-tree
//! - `parallel`: runs mesh relaxation on rayon
//! - `serde`: serialization for configuration, meshes and topology

pub mod error;
pub mod config;
pub mod random;
pub mod mesh;
pub mod topology;
pub mod terrain;
pub mod planet;
pub mod surface;
mod util;

#[cfg(feature = "spatial-index")]
pub mod spatial;

pub use error::{PlanetError, Result};
pub use config::{PlanetConfig, PlanetConfigBuilder, PlanetSize};
pub use random::XorShift128;
pub use mesh::{build_mesh, build_mesh_with_options, DistortionReport, MeshGraph, RelaxOptions};
pub use topology::{derive_topology, Border, Corner, Entity, Tile, Topology};
pub use terrain::{generate_terrain, Biome, Interaction, Plate, TerrainSettings, Whorl};
pub use planet::Planet;
pub use surface::{
    generate_surface, generate_surface_with_visibility, BiomeColorMapper, ElevationColorMapper,
    MeshData, PlateColorMapper, TileColor, TileColorMapper,
};

#[cfg(feature = "spatial-index")]
pub use spatial::SpatialIndex;

pub use glam::Vec3;
