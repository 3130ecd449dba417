//! Example: Generate an icosphere planet
//!
//! Runs the whole pipeline on a tiny planet and prints a summary.

use icosphere_planet::*;

fn main() {
    println!("Icosphere Planet Generation Example");
    println!("===================================\n");

    let config = PlanetConfigBuilder::new()
        .seed([42, 1337, 7, 99])
        .planet_size(PlanetSize::Tiny) // Tiny keeps the example fast
        .plate_count(20)
        .unwrap()
        .build()
        .unwrap();

    println!("Configuration:");
    println!("  Seed: {:?}", config.seed);
    println!("  Planet Size: {}", config.planet_size.name());
    println!("  Subdivision Degree: {}", config.degree());
    println!("  Tile Count: {}", config.tile_count());
    println!("  Sphere Radius: {}", config.radius());
    println!("  Distortion: {}", config.distortion);
    println!("  Plates: {}", config.terrain.plate_count);
    println!();

    println!("Generating planet...");
    let planet = Planet::generate(config).expect("Failed to generate planet");
    println!("Generated {} tiles\n", planet.tile_count());

    let mut sides = [0usize; 8];
    for tile in planet.tiles() {
        sides[tile.sides().min(7)] += 1;
    }
    let land = planet.tiles().iter().filter(|t| t.is_land()).count();
    let oceanic = planet.plates().iter().filter(|p| p.oceanic).count();

    println!("Statistics:");
    println!("  Pentagons / hexagons / heptagons: {} / {} / {}", sides[5], sides[6], sides[7]);
    println!("  Land tiles: {:.1}%", 100.0 * land as f32 / planet.tile_count() as f32);
    println!("  Oceanic plates: {} of {}", oceanic, planet.plates().len());
    println!(
        "  Surface area: {:.0} (sphere: {:.0})",
        planet.topology().total_area(),
        4.0 * std::f32::consts::PI * planet.radius() * planet.radius()
    );
    println!();

    println!("Biomes:");
    for (biome, count) in planet.biome_histogram() {
        println!("  {:<18} {}", biome.name(), count);
    }
    println!();

    println!("Sample tiles:");
    for tile in planet.tiles().iter().take(5) {
        println!(
            "  Tile {}: elevation={:.2}, temperature={:.2}, humidity={:.2}, biome={}",
            tile.id,
            tile.elevation,
            tile.temperature,
            tile.humidity,
            tile.biome.map_or("none", Biome::name)
        );
    }

    let mesh = generate_surface(planet.topology(), &BiomeColorMapper::default());
    println!("\nSurface mesh: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());

    println!("\nGeneration complete!");
}
