use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use invoice_data::ArticleCatalogLoader;
use invoice_db_sqlite::SqliteRepository;

/// Load the article catalog from a CSV file into the database.
///
/// The CSV file should have the following columns:
/// - ean: European article number, unique per article
/// - description: Text copied onto invoice lines
/// - unit_price: Net price of one unit
/// - tax_rate: The tax rate as a decimal (e.g., 0.19)
///
/// Articles that already exist are updated in place, matched by EAN.
#[derive(Parser, Debug)]
#[command(name = "invoice-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing the article catalog
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database path or URL (created if missing)
    #[arg(short, long, default_value = "invoices.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
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

    println!("Loading articles from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = ArticleCatalogLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let written = ArticleCatalogLoader::load(&repo, &records)
        .await
        .context("Failed to load articles into database")?;

    println!("Successfully loaded {} articles into the database.", written);

    Ok(())
}
