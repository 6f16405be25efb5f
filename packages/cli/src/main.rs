#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operator CLI for the siting map toolchain.
//!
//! Rebuilds the boundary and statistics store from its source files,
//! clears it, audits the raster directory, and inspects single rasters.
//! Without a subcommand it runs an interactive menu that can also start
//! the API server.
//!
//! Uses `indicatif-log-bridge` (via [`siting_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod commands;
mod interactive;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use siting_map_sync::SyncOptions;
use siting_map_sync::boundary_source::DEFAULT_NAME_PROPERTY;

#[derive(Parser)]
#[command(name = "siting_map_cli", about = "Siting map operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the boundary and statistics tables from the source files
    Sync {
        /// Boundary source (`var x = {FeatureCollection};` or bare `GeoJSON`)
        #[arg(long)]
        boundaries: Option<PathBuf>,
        /// Per-region statistics CSV
        #[arg(long)]
        statistics: Option<PathBuf>,
        /// Store to rebuild (defaults to `DATABASE_PATH` or data/shared/siting.duckdb)
        #[arg(long)]
        database: Option<PathBuf>,
        /// Feature property holding the region name
        #[arg(long, default_value = DEFAULT_NAME_PROPERTY)]
        name_property: String,
        /// Fail if any statistics row matches no boundary
        #[arg(long)]
        strict: bool,
    },
    /// Clear the boundary and statistics tables
    Reset {
        /// Store to clear
        #[arg(long)]
        database: Option<PathBuf>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Check that every required raster exists and opens
    AuditRasters {
        /// Raster directory (defaults to `RASTER_DIR` or data/rasters)
        #[arg(long)]
        raster_dir: Option<PathBuf>,
    },
    /// Print the georeferencing and band statistics of one `GeoTIFF`
    Inspect {
        /// Path to the `GeoTIFF`
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = siting_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive::run(&multi);
    };

    match command {
        Commands::Sync {
            boundaries,
            statistics,
            database,
            name_property,
            strict,
        } => {
            let mut options = SyncOptions::new(
                boundaries.unwrap_or_else(siting_map_database::paths::boundary_source_path),
                statistics.unwrap_or_else(siting_map_database::paths::statistics_source_path),
            );
            options.name_property = name_property;
            options.strict = strict;

            let database = database.unwrap_or_else(commands::default_database);
            commands::sync(&multi, &database, &options)?;
        }
        Commands::Reset { database, yes } => {
            let database = database.unwrap_or_else(commands::default_database);
            if yes || interactive::confirm_reset(&database)? {
                commands::reset(&database)?;
            } else {
                println!("Cancelled.");
            }
        }
        Commands::AuditRasters { raster_dir } => {
            let raster_dir = raster_dir.unwrap_or_else(commands::default_raster_dir);
            commands::audit_rasters(&raster_dir)?;
        }
        Commands::Inspect { file } => commands::inspect(&file)?,
    }

    Ok(())
}
