use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod api;
mod db;
mod models;
mod parser;
mod stats;

#[derive(Parser)]
#[command(name = "weather-pipeline")]
#[command(about = "Weather station ingestion, yearly statistics, and read API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Ingest station flat files from a directory
    Ingest {
        #[arg(long)]
        dir: PathBuf,
    },
    /// Compute yearly per-station statistics from ingested data
    Aggregate,
    /// Serve the paginated read API
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Ingest { dir } => {
            let summary = db::ingest_dir(&pool, &dir).await?;
            println!(
                "Ingested {} rows from {} files ({} failed to parse).",
                summary.rows_inserted, summary.files_ingested, summary.files_failed
            );
        }
        Commands::Aggregate => {
            let records = db::fetch_measured_records(&pool).await?;
            let stats = stats::yearly_stats(&records);
            let written = db::insert_stats(&pool, &stats).await?;
            println!(
                "Computed {} station-year rows, wrote {written} new.",
                stats.len()
            );
        }
        Commands::Serve { bind } => {
            api::serve(pool, &bind).await?;
        }
    }

    Ok(())
}
