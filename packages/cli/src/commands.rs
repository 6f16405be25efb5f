//! Operator commands shared by the subcommand and interactive entry points.

use std::path::{Path, PathBuf};
use std::time::Instant;

use siting_map_cli_utils::{IndicatifProgress, MultiProgress};
use siting_map_database::{meta, schema};
use siting_map_raster::audit::{self, AuditOutcome, LayerAudit};
use siting_map_raster::geotiff::BandStatistics;
use siting_map_raster::RasterMetadata;
use siting_map_sync::{SyncOptions, SyncReport};

type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Rebuilds the boundary and statistics tables in `database` from the
/// source files in `options`.
pub fn sync(multi: &MultiProgress, database: &Path, options: &SyncOptions) -> CommandResult<SyncReport> {
    let start = Instant::now();
    let conn = schema::open(database)?;

    let progress = IndicatifProgress::steps_bar(multi, "Spatial sync");
    let report = siting_map_sync::run_pipeline(&conn, options, progress.as_ref())?;

    println!("{}", format_report(&report));
    log::info!("Sync finished in {:.1}s", start.elapsed().as_secs_f64());

    Ok(report)
}

/// Clears the live tables in `database`.
pub fn reset(database: &Path) -> CommandResult {
    let conn = schema::open(database)?;
    let last_sync = meta::last_sync_at(&conn)?;

    schema::reset(&conn)?;

    match last_sync {
        Some(at) => println!("Cleared tables last synced at {}", at.to_rfc3339()),
        None => println!("Cleared tables"),
    }
    Ok(())
}

/// Checks every configured layer in `raster_dir`.
///
/// Fails if any layer is missing or unreadable.
pub fn audit_rasters(raster_dir: &Path) -> CommandResult<Vec<LayerAudit>> {
    println!("Auditing rasters in {}", raster_dir.display());
    println!();

    let audits = audit::audit(raster_dir);
    for layer in &audits {
        println!("{}", format_audit(layer));
    }

    let failed = audits.iter().filter(|a| !a.is_valid()).count();
    println!();
    if failed > 0 {
        return Err(format!("{failed} of {} raster layers missing or unreadable", audits.len()).into());
    }

    println!("All {} raster layers OK", audits.len());
    Ok(audits)
}

/// Prints the georeferencing and band-1 statistics of one `GeoTIFF`.
pub fn inspect(path: &Path) -> CommandResult {
    let (metadata, statistics) = audit::inspect(path)?;

    println!("{}", path.display());
    println!("{}", format_metadata(&metadata));
    println!("{}", format_statistics(&statistics));
    Ok(())
}

/// Default path of the store, honouring `DATABASE_PATH`.
#[must_use]
pub fn default_database() -> PathBuf {
    siting_map_database::paths::from_env_or("DATABASE_PATH", siting_map_database::paths::database_path)
}

/// Default raster directory, honouring `RASTER_DIR`.
#[must_use]
pub fn default_raster_dir() -> PathBuf {
    siting_map_database::paths::from_env_or("RASTER_DIR", siting_map_database::paths::raster_dir)
}

fn format_report(report: &SyncReport) -> String {
    let mut out = format!(
        "Synced {} boundaries and {} statistics rows",
        report.boundaries, report.statistics
    );
    if !report.orphaned.is_empty() {
        out.push_str(&format!(
            "\n{} statistics rows match no boundary: {}",
            report.orphaned.len(),
            report.orphaned.join(", ")
        ));
    }
    out
}

fn format_audit(layer: &LayerAudit) -> String {
    match &layer.outcome {
        AuditOutcome::Valid(metadata) => format!(
            "[OK]      {:<20} {}\n{}",
            layer.layer.as_ref(),
            layer.path.display(),
            format_metadata(metadata)
        ),
        AuditOutcome::Missing => format!(
            "[MISSING] {:<20} {}",
            layer.layer.as_ref(),
            layer.path.display()
        ),
        AuditOutcome::Unreadable(e) => format!(
            "[ERROR]   {:<20} {}: {e}",
            layer.layer.as_ref(),
            layer.path.display()
        ),
    }
}

fn format_metadata(metadata: &RasterMetadata) -> String {
    let (min_x, min_y, max_x, max_y) = metadata.bounds();
    let (res_x, res_y) = metadata.transform.resolution();
    let nodata = metadata
        .nodata
        .map_or_else(|| "none".to_string(), |n| n.to_string());

    format!(
        "          CRS:        {}\n          Bounds:     ({min_x}, {min_y}) - ({max_x}, {max_y})\n          Size:       {} x {}\n          Resolution: {res_x} x {res_y}\n          NoData:     {nodata}",
        metadata.crs, metadata.width, metadata.height
    )
}

fn format_statistics(statistics: &BandStatistics) -> String {
    let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
    format!(
        "          Valid:      {} of {} cells\n          Min:        {}\n          Max:        {}\n          Mean:       {}",
        statistics.valid_cells,
        statistics.total_cells,
        show(statistics.min),
        show(statistics.max),
        show(statistics.mean)
    )
}
