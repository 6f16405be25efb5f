//! Interactive menu shown when the CLI runs without a subcommand.

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};
use siting_map_cli_utils::MultiProgress;
use siting_map_sync::SyncOptions;
use siting_map_sync::boundary_source::DEFAULT_NAME_PROPERTY;

use crate::commands;

/// Top-level tool selection.
enum Tool {
    Sync,
    AuditRasters,
    Inspect,
    Reset,
    Server,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Sync,
        Self::AuditRasters,
        Self::Inspect,
        Self::Reset,
        Self::Server,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Sync => "Sync boundaries & statistics",
            Self::AuditRasters => "Audit rasters",
            Self::Inspect => "Inspect a raster",
            Self::Reset => "Reset boundary & statistics tables",
            Self::Server => "Start server",
        }
    }
}

/// Prompts for a tool and runs it.
pub fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("Siting Map Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Sync => {
            let boundaries = prompt_path(
                "Boundary source",
                siting_map_database::paths::boundary_source_path(),
            )?;
            let statistics = prompt_path(
                "Statistics CSV",
                siting_map_database::paths::statistics_source_path(),
            )?;
            let name_property: String = Input::new()
                .with_prompt("Region name property")
                .default(DEFAULT_NAME_PROPERTY.to_string())
                .interact_text()?;
            let strict = Confirm::new()
                .with_prompt("Fail if statistics match no boundary?")
                .default(false)
                .interact()?;

            let mut options = SyncOptions::new(boundaries, statistics);
            options.name_property = name_property;
            options.strict = strict;

            commands::sync(multi, &commands::default_database(), &options)?;
        }
        Tool::AuditRasters => {
            let raster_dir = prompt_path("Raster directory", commands::default_raster_dir())?;
            commands::audit_rasters(&raster_dir)?;
        }
        Tool::Inspect => {
            let file: String = Input::new().with_prompt("GeoTIFF path").interact_text()?;
            commands::inspect(Path::new(&file))?;
        }
        Tool::Reset => {
            let database = commands::default_database();
            if confirm_reset(&database)? {
                commands::reset(&database)?;
            } else {
                println!("Cancelled.");
            }
        }
        Tool::Server => {
            actix_web::rt::System::new().block_on(siting_map_server::interactive::run())?;
        }
    }

    Ok(())
}

/// Asks before clearing the live tables.
pub fn confirm_reset(database: &Path) -> Result<bool, dialoguer::Error> {
    Confirm::new()
        .with_prompt(format!(
            "Clear all boundaries and statistics in {}?",
            database.display()
        ))
        .default(false)
        .interact()
}

fn prompt_path(prompt: &str, default: PathBuf) -> Result<PathBuf, dialoguer::Error> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;
    Ok(PathBuf::from(value))
}
