#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rebuilds the administrative boundary and region statistics tables from
//! their source files.
//!
//! The run loads everything into staging tables first and then swaps the
//! staged rows into the live tables in a single transaction, so readers see
//! either the previous data set or the new one. Any failure rolls back,
//! drops the staging tables, and leaves the live tables untouched.

pub mod boundary_source;
pub mod progress;
pub mod statistics_source;

use std::collections::BTreeSet;
use std::path::PathBuf;

use duckdb::Connection;
use siting_map_database::{DbError, TableSet, boundaries, in_transaction, meta, schema, statistics};
use siting_map_region_models::{NameReconciliationMap, RegionStatistic, normalize_region_name};
use strum_macros::Display;

use crate::progress::ProgressCallback;

/// Errors that abort a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A source file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The boundary source holds no usable `FeatureCollection`.
    #[error("Invalid boundary source: {0}")]
    InvalidBoundarySource(String),

    /// A boundary feature has no region name.
    #[error("Boundary feature {index} has no {property:?} property")]
    MissingName {
        /// Zero-based feature index.
        index: usize,
        /// The expected name property.
        property: String,
    },

    /// A boundary geometry is missing, not polygonal, or empty.
    #[error("Boundary {name:?} has no usable polygon geometry")]
    InvalidGeometry {
        /// Region name of the feature.
        name: String,
    },

    /// Two boundary features share a name.
    #[error("Duplicate boundary name {0:?}")]
    DuplicateBoundary(String),

    /// Two statistics rows reconcile to the same name.
    #[error("Duplicate statistics for {0:?} after name reconciliation")]
    DuplicateStatistic(String),

    /// A statistics row has a blank name.
    #[error("Statistics row {row} has no state_name")]
    MissingStatisticName {
        /// One-based data row number.
        row: usize,
    },

    /// Statistics whose names match no boundary, in strict mode.
    #[error("Statistics without a matching boundary: {}", .0.join(", "))]
    OrphanedStatistics(Vec<String>),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Geometry serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<duckdb::Error> for SyncError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(DbError::DuckDb(e))
    }
}

/// Stages of a sync run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SyncStage {
    /// Recreate the staging tables.
    PrepareStaging,
    /// Parse the boundary source.
    ParseBoundarySource,
    /// Insert boundaries into staging.
    InsertBoundaries,
    /// Commit the staged boundaries.
    FlushBoundaries,
    /// Parse the statistics CSV.
    ParseStatisticSource,
    /// Rewrite statistics names through the reconciliation map.
    ApplyNameReconciliation,
    /// Insert statistics into staging.
    InsertStatistics,
    /// Replace the live tables with staging.
    Swap,
}

impl SyncStage {
    /// Every stage in run order.
    pub const ALL: &[Self] = &[
        Self::PrepareStaging,
        Self::ParseBoundarySource,
        Self::InsertBoundaries,
        Self::FlushBoundaries,
        Self::ParseStatisticSource,
        Self::ApplyNameReconciliation,
        Self::InsertStatistics,
        Self::Swap,
    ];
}

/// Inputs of a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Boundary source file.
    pub boundaries_path: PathBuf,
    /// Statistics CSV.
    pub statistics_path: PathBuf,
    /// Feature property holding the region name.
    pub name_property: String,
    /// Fail the run if any statistics row matches no boundary.
    pub strict: bool,
    /// Statistics name aliases.
    pub aliases: NameReconciliationMap,
}

impl SyncOptions {
    /// Options with the default name property, alias map, and non-strict
    /// orphan handling.
    #[must_use]
    pub fn new(boundaries_path: PathBuf, statistics_path: PathBuf) -> Self {
        Self {
            boundaries_path,
            statistics_path,
            name_property: boundary_source::DEFAULT_NAME_PROPERTY.to_string(),
            strict: false,
            aliases: NameReconciliationMap::default(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Boundaries now live.
    pub boundaries: u64,
    /// Statistics rows now live.
    pub statistics: u64,
    /// Reconciled statistics names with no matching boundary.
    pub orphaned: Vec<String>,
}

/// Runs the full pipeline against `conn`.
///
/// Assumes exclusive access to the store for the duration of the run.
///
/// # Errors
///
/// Returns [`SyncError`] if any stage fails. The live tables are unchanged
/// and the staging tables are dropped.
pub fn run_pipeline(
    conn: &Connection,
    options: &SyncOptions,
    progress: &dyn ProgressCallback,
) -> Result<SyncReport, SyncError> {
    progress.set_total(u64::try_from(SyncStage::ALL.len()).unwrap_or(u64::MAX));

    let result = run_stages(conn, options, progress);

    if let Err(e) = schema::drop_staging(conn) {
        log::error!("Failed to drop staging tables: {e}");
    }

    match result {
        Ok(report) => {
            progress.finish(format!(
                "Synced {} boundaries and {} statistics",
                report.boundaries, report.statistics
            ));
            Ok(report)
        }
        Err(e) => {
            log::error!("Spatial sync failed, live tables left unchanged: {e}");
            progress.finish_and_clear();
            Err(e)
        }
    }
}

fn run_stages(
    conn: &Connection,
    options: &SyncOptions,
    progress: &dyn ProgressCallback,
) -> Result<SyncReport, SyncError> {
    enter(SyncStage::PrepareStaging, progress);
    schema::create_schema(conn)?;
    schema::prepare_staging(conn)?;

    enter(SyncStage::ParseBoundarySource, progress);
    log::info!("Reading boundaries from {}", options.boundaries_path.display());
    let boundary_rows =
        boundary_source::read_boundary_source(&options.boundaries_path, &options.name_property)?;
    log::info!("Parsed {} boundaries", boundary_rows.len());

    enter(SyncStage::InsertBoundaries, progress);
    let boundary_count = in_transaction(conn, |conn| -> Result<u64, SyncError> {
        let inserted = boundaries::insert_all(conn, TableSet::Staging, &boundary_rows)?;
        enter(SyncStage::FlushBoundaries, progress);
        Ok(inserted)
    })?;
    log::info!("Committed {boundary_count} staged boundaries");

    enter(SyncStage::ParseStatisticSource, progress);
    log::info!("Reading statistics from {}", options.statistics_path.display());
    let records = statistics_source::read_statistics_source(&options.statistics_path)?;

    enter(SyncStage::ApplyNameReconciliation, progress);
    let statistic_rows = reconcile(&records, &options.aliases)?;

    let boundary_keys: BTreeSet<String> = boundary_rows
        .iter()
        .map(|b| normalize_region_name(&b.region_name))
        .collect();
    let orphaned: Vec<String> = statistic_rows
        .iter()
        .filter(|s| !boundary_keys.contains(&normalize_region_name(&s.region_name)))
        .map(|s| s.region_name.clone())
        .collect();
    for name in &orphaned {
        log::warn!("Statistics for {name:?} match no boundary");
    }
    if options.strict && !orphaned.is_empty() {
        return Err(SyncError::OrphanedStatistics(orphaned));
    }

    enter(SyncStage::InsertStatistics, progress);
    let statistic_count = in_transaction(conn, |conn| -> Result<u64, SyncError> {
        Ok(statistics::insert_all(conn, TableSet::Staging, &statistic_rows)?)
    })?;

    enter(SyncStage::Swap, progress);
    in_transaction(conn, |conn| -> Result<(), SyncError> {
        schema::promote_staging(conn)?;
        meta::record_sync(conn, chrono::Utc::now())?;
        Ok(())
    })?;

    log::info!(
        "Spatial sync complete: {boundary_count} boundaries, {statistic_count} statistics, {} orphaned",
        orphaned.len()
    );

    Ok(SyncReport {
        boundaries: boundary_count,
        statistics: statistic_count,
        orphaned,
    })
}

/// Applies the alias map to every record and assigns ids in source order.
fn reconcile(
    records: &[statistics_source::StatisticRecord],
    aliases: &NameReconciliationMap,
) -> Result<Vec<RegionStatistic>, SyncError> {
    let mut seen = BTreeSet::new();
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let region_name = aliases.reconcile(&record.state_name);
        if region_name != record.state_name {
            log::debug!("Reconciled {:?} to {region_name:?}", record.state_name);
        }
        if !seen.insert(normalize_region_name(&region_name)) {
            return Err(SyncError::DuplicateStatistic(region_name));
        }

        rows.push(RegionStatistic {
            id: i64::try_from(index + 1).unwrap_or(i64::MAX),
            region_name,
            values: record.values,
        });
    }

    Ok(rows)
}

fn enter(stage: SyncStage, progress: &dyn ProgressCallback) {
    log::info!("Sync stage: {stage}");
    progress.set_message(stage.to_string());
    progress.inc(1);
}
