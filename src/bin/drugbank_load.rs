//! drugbank-load: Build a SQLite database from melted table CSVs
//!
//! Usage:
//!   # Load the restricted tables under short names (general_info, synonyms, ...)
//!   drugbank-load --csv-dir ./drugbank_csvs --db drugbank.db
//!
//!   # Load every CSV in the directory, one table per file
//!   drugbank-load --csv-dir ./drugbank_csvs --db drugbank.db --all

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use drugbank_melt::load::{LoadPlan, SqliteLoader};
use std::path::PathBuf;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "drugbank-load")]
#[command(about = "Load melted DrugBank tables into SQLite", long_about = None)]
struct Args {
    /// Directory holding `<table>.csv` files
    #[arg(long, env = "DRUGBANK_OUTPUT_DIR")]
    csv_dir: PathBuf,

    /// SQLite database file (created if missing)
    #[arg(long, env = "DRUGBANK_DB")]
    db: PathBuf,

    /// Load every CSV under its file name instead of the restricted table set
    #[arg(long)]
    all: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let plan = if args.all { LoadPlan::All } else { LoadPlan::restricted() };

    let mut loader = SqliteLoader::open(&args.db)
        .with_context(|| format!("Failed to open database {}", args.db.display()))?;
    let summary = loader
        .load_csv_dir(&args.csv_dir, &plan)
        .with_context(|| format!("Failed to load {}", args.csv_dir.display()))?;

    info!(
        tables = summary.loaded.len(),
        failed = summary.failed.len(),
        rows = summary.rows(),
        db = %args.db.display(),
        "database complete"
    );
    Ok(())
}
