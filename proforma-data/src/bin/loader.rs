use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use proforma_data::CatalogLoader;
use proforma_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load catalog brands and models from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - brand: brand name (created if missing)
/// - equipment_type: tractor or implement
/// - model: model name
/// - description: technical specifications (may be empty)
/// - base_price: list price
/// - image_path: product image (may be empty)
#[derive(Parser, Debug)]
#[command(name = "proforma-catalog-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing catalog data
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g., sqlite:proforma.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:proforma.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading catalog from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = CatalogLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let summary = CatalogLoader::load(&repo, &records)
        .await
        .context("Failed to load catalog into database")?;

    println!(
        "Catalog loaded: {} brands created, {} models created, {} models updated.",
        summary.brands_created, summary.models_created, summary.models_updated
    );

    Ok(())
}
