//! Parser for the per-region statistics CSV.
//!
//! The file has a `state_name` column and one column per metric. Empty
//! cells are null. Unknown columns are ignored.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use siting_map_region_models::StatisticValues;

use crate::SyncError;

/// One row of the statistics file, before name reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticRecord {
    /// Region name as written in the file.
    pub state_name: String,
    /// The metrics.
    pub values: StatisticValues,
}

#[derive(Deserialize)]
struct CsvRow {
    state_name: String,
    mean_ghi: Option<f64>,
    mean_wpd: Option<f64>,
    mean_wind_speed_ms: Option<f64>,
    solar_highly_suitable_km2: Option<f64>,
    solar_mean_score: Option<f64>,
    wind_highly_suitable_km2: Option<f64>,
    wind_mean_score: Option<f64>,
}

impl From<CsvRow> for StatisticRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            state_name: row.state_name.trim().to_string(),
            values: StatisticValues {
                mean_ghi: row.mean_ghi,
                mean_wpd: row.mean_wpd,
                mean_wind_speed_ms: row.mean_wind_speed_ms,
                solar_highly_suitable_km2: row.solar_highly_suitable_km2,
                solar_mean_score: row.solar_mean_score,
                wind_highly_suitable_km2: row.wind_highly_suitable_km2,
                wind_mean_score: row.wind_mean_score,
            },
        }
    }
}

/// Reads the statistics file at `path`.
///
/// # Errors
///
/// Returns [`SyncError::Io`] if the file cannot be opened, otherwise see
/// [`parse_statistics`].
pub fn read_statistics_source(path: &Path) -> Result<Vec<StatisticRecord>, SyncError> {
    let file = std::fs::File::open(path).map_err(|source| SyncError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_statistics(file)
}

/// Parses statistics rows from CSV.
///
/// # Errors
///
/// Returns [`SyncError::Csv`] on a malformed row or a non-numeric metric,
/// and [`SyncError::MissingStatisticName`] for a row with a blank name.
pub fn parse_statistics(reader: impl Read) -> Result<Vec<StatisticRecord>, SyncError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, result) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let record = StatisticRecord::from(result?);
        if record.state_name.is_empty() {
            return Err(SyncError::MissingStatisticName { row: index + 1 });
        }
        records.push(record);
    }

    Ok(records)
}
