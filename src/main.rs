//! # Price Catalog CLI (`pricectl`)
//!
//! The `pricectl` binary initializes the database, imports and exports
//! catalog archives, prints statistics, and starts the HTTP server.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pricectl init` | Create the SQLite database and schema |
//! | `pricectl import <archive>` | Ingest a ZIP (default) or TAR archive |
//! | `pricectl export` | Write all rows as `data.csv` inside a ZIP |
//! | `pricectl stats` | Print row, category, and price totals |
//! | `pricectl serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! pricectl --config ./config/prices.toml init
//! pricectl --config ./config/prices.toml import ./upload.tar --type tar
//! pricectl --config ./config/prices.toml export --output ./out/data.zip
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use price_catalog::archive::ContainerKind;
use price_catalog::{config, export, ingest, logging, migrate, server, stats};

/// Price catalog ingestion and export.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "pricectl",
    about = "Price catalog: ingest CSV-in-archive uploads, export the catalog as ZIP",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/prices.toml")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Ingest one archive file.
    ///
    /// The first entry ending in the configured suffix (`.csv`) is decoded
    /// and inserted in a single transaction. Prints the aggregate summary
    /// as JSON.
    Import {
        /// Path to the archive.
        archive: PathBuf,

        /// Container format: `zip` (default) or `tar`.
        #[arg(long = "type", default_value = "zip")]
        kind: String,
    },

    /// Export all rows as a ZIP archive.
    Export {
        /// Output file.
        #[arg(long, default_value = "./data.zip")]
        output: PathBuf,
    },

    /// Show catalog statistics.
    Stats,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { archive, kind } => {
            ingest::run_import(&cfg, &archive, ContainerKind::from_selector(&kind)).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, &output).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
