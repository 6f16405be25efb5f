//! Administrative boundary storage.

use duckdb::{Connection, Row};
use siting_map_energy_models::BoundingBox;
use siting_map_region_models::{AdministrativeBoundary, WGS84_SRID, normalize_region_name};

use crate::{DbError, TableSet};

const COLUMNS: &str = "id, region_name, boundary_geojson, min_lon, min_lat, max_lon, max_lat";

/// Inserts `boundaries` into `tables`.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails, including a uniqueness
/// violation on the staging table.
pub fn insert_all(
    conn: &Connection,
    tables: TableSet,
    boundaries: &[AdministrativeBoundary],
) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} (id, region_name, region_key, srid, boundary_geojson,
                         min_lon, min_lat, max_lon, max_lat)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        tables.boundaries()
    ))?;

    let mut inserted = 0_u64;
    for boundary in boundaries {
        let rows = stmt.execute(duckdb::params![
            boundary.id,
            boundary.region_name,
            normalize_region_name(&boundary.region_name),
            WGS84_SRID,
            boundary.boundary_geojson,
            boundary.bbox.west,
            boundary.bbox.south,
            boundary.bbox.east,
            boundary.bbox.north,
        ])?;
        inserted += u64::try_from(rows).unwrap_or(0);
    }

    Ok(inserted)
}

/// Returns every boundary in `tables`, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list(conn: &Connection, tables: TableSet) -> Result<Vec<AdministrativeBoundary>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM {} ORDER BY id",
        tables.boundaries()
    ))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Returns the live boundary whose normalized name equals `key`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_by_key(conn: &Connection, key: &str) -> Result<Option<AdministrativeBoundary>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM {} WHERE region_key = ? ORDER BY id LIMIT 1",
        TableSet::Live.boundaries()
    ))?;
    match stmt.query_row([key], from_row) {
        Ok(boundary) => Ok(Some(boundary)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Returns the live boundaries whose bounding box contains `(lon, lat)`,
/// ordered by id.
///
/// This is only a prefilter; callers must test exact containment.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn bbox_candidates(conn: &Connection, lon: f64, lat: f64) -> Result<Vec<AdministrativeBoundary>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM {}
         WHERE min_lon <= ? AND max_lon >= ? AND min_lat <= ? AND max_lat >= ?
         ORDER BY id",
        TableSet::Live.boundaries()
    ))?;
    let rows = stmt.query_map(duckdb::params![lon, lon, lat, lat], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Returns the number of boundaries in `tables`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection, tables: TableSet) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM {}", tables.boundaries()))?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    Ok(crate::count_to_u64(count))
}

fn from_row(row: &Row<'_>) -> duckdb::Result<AdministrativeBoundary> {
    Ok(AdministrativeBoundary {
        id: row.get(0)?,
        region_name: row.get(1)?,
        boundary_geojson: row.get(2)?,
        bbox: BoundingBox::new(row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use siting_map_energy_models::BoundingBox;
    use siting_map_region_models::AdministrativeBoundary;

    /// An axis-aligned square boundary.
    pub fn square(id: i64, name: &str, west: f64, south: f64, east: f64, north: f64) -> AdministrativeBoundary {
        AdministrativeBoundary {
            id,
            region_name: name.to_string(),
            boundary_geojson: format!(
                r#"{{"type":"MultiPolygon","coordinates":[[[[{west},{south}],[{east},{south}],[{east},{north}],[{west},{north}],[{west},{south}]]]]}}"#
            ),
            bbox: BoundingBox::new(west, south, east, north),
        }
    }
}
