//! # Reference Data Seeder
//!
//! Prepares a depot database: runs migrations, inserts the default brands
//! and tire sizes, and optionally demo racks.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by DEPO_DB_PATH (default ./lastik_depo.db)
//! cargo run -p depo-db --bin seed
//!
//! # Specify database path and add racks A-1..A-8
//! cargo run -p depo-db --bin seed -- --db ./data/depo.db --demo
//! ```
//!
//! Running it twice is harmless: existing brands, sizes and racks are kept.

use depo_db::{Database, DbError, DepotSettings};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_RACK_PREFIX: &str = "A";
const DEMO_RACK_COUNT: i64 = 8;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,depo=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_help() {
    println!("Lastik Depo Seeder");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>    Database file path (default: $DEPO_DB_PATH or ./lastik_depo.db)");
    println!("      --demo         Also create demo racks A-1..A-8");
    println!("  -h, --help         Show this help message");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut settings = DepotSettings::from_env()?;
    let mut demo = false;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    settings.database_path = PathBuf::from(path);
                    i += 1;
                }
            }
            "--demo" => demo = true,
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    println!("🌱 Lastik Depo Seeder");
    println!("=====================");
    println!("Database: {}", settings.database_path.display());
    println!();

    let db = Database::new(settings.db_config()).await?;
    let (total, applied) = db.migration_status().await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied: {applied}/{total}");

    let brands = db.brands().ensure_defaults().await?;
    println!("✓ Brands inserted: {brands}");

    let sizes = db.tire_sizes().ensure_defaults().await?;
    println!("✓ Tire sizes inserted: {sizes}");

    if demo {
        match db.racks().create_bulk(DEMO_RACK_PREFIX, DEMO_RACK_COUNT).await {
            Ok(created) => println!("✓ Demo racks created: {}", created.len()),
            Err(DbError::Conflict { .. }) => println!("✓ Demo racks already present"),
            Err(e) => return Err(e.into()),
        }
    }

    let customers = db.customers().count().await?;
    let racks = db.racks().list().await?.len();
    let tires = db.tires().count().await?;
    let history = db.history().count().await?;
    let max_serial = db.tires().max_serial().await?;

    println!();
    println!("Summary");
    println!("  Customers:  {customers}");
    println!("  Racks:      {racks}");
    println!("  Tires:      {tires}");
    println!("  History:    {history}");
    match max_serial {
        Some(serial) => println!("  Max serial: {serial}"),
        None => println!("  Max serial: -"),
    }

    info!(customers, racks, tires, history, "Seed complete");
    db.close().await;

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
