//! # Seed Data Generator
//!
//! Populates the database with demo items and measurements for development.
//!
//! ## Usage
//! ```bash
//! # Generate 20 items (default)
//! cargo run -p fastca-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p fastca-db --bin seed -- --count 100
//!
//! # Specify database path
//! cargo run -p fastca-db --bin seed -- --db ./data/fastca_database.db
//! ```
//!
//! Each item gets between one and five measurements named after common
//! surfaces, with dimensions in millimetres.

use std::env;

use fastca_core::{total_area, Item, Measurement};
use fastca_db::{Database, DbConfig};

/// Surface names for realistic test data
const SURFACES: &[&str] = &[
    "Wall", "Floor", "Ceiling", "Door", "Window", "Shelf", "Panel", "Tabletop",
];

/// Typical dimensions in millimetres
const DIMENSIONS: &[f64] = &[450.0, 600.0, 800.0, 1200.0, 1500.0, 2000.0, 2400.0, 3000.0];

const DEFAULT_COUNT: usize = 20;
const DEFAULT_DB: &str = "./fastca_dev.db";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = DEFAULT_COUNT;
    let mut db_path = String::from(DEFAULT_DB);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("FastCa Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to generate (default: {DEFAULT_COUNT})");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 FastCa Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Items:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Schema at current version");

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating items...");

    let repo = db.repository();
    let start = std::time::Instant::now();
    let mut measurements = 0;
    let mut area = 0.0;

    for seed in 0..count {
        let item = Item::new();
        repo.add_item(&item).await?;

        let rows = generate_measurements(&item, seed);
        for m in &rows {
            if let Err(e) = repo.add_measurement(m).await {
                eprintln!("Failed to insert measurement {}: {}", m.id, e);
                continue;
            }
            measurements += 1;
        }
        area += total_area(&rows);
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} items with {} measurements in {:?}",
        count, measurements, elapsed
    );
    println!("  Total area: {:.2} m²", area);

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates the measurements of one item.
///
/// `created_at` values are spaced one second apart so the display order
/// matches generation order.
fn generate_measurements(item: &Item, seed: usize) -> Vec<Measurement> {
    let rows = 1 + seed % 5;
    let base = Measurement::new(&item.id).created_at;

    (0..rows)
        .map(|row| {
            let n = seed * 7 + row * 3;
            Measurement {
                name: format!("{} {}", SURFACES[n % SURFACES.len()], row + 1),
                length: DIMENSIONS[n % DIMENSIONS.len()],
                width: DIMENSIONS[(n / 2) % DIMENSIONS.len()],
                count: 1 + (n % 4) as i64,
                created_at: base + row as i64 * 1000,
                ..Measurement::new(&item.id)
            }
        })
        .collect()
}
