//! Region statistic storage.

use duckdb::{Connection, Row};
use siting_map_region_models::{
    AdministrativeBoundary, RegionStatistic, StatisticValues, normalize_region_name,
};

use crate::{DbError, TableSet};

fn select_columns() -> String {
    format!("id, region_name, {}", StatisticValues::COLUMNS.join(", "))
}

/// Inserts `statistics` into `tables`.
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
    statistics: &[RegionStatistic],
) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {} (id, region_name, region_key, {})
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        tables.statistics(),
        StatisticValues::COLUMNS.join(", "),
    ))?;

    let mut inserted = 0_u64;
    for statistic in statistics {
        let [a, b, c, d, e, f, g] = statistic.values.to_array();
        let rows = stmt.execute(duckdb::params![
            statistic.id,
            statistic.region_name,
            normalize_region_name(&statistic.region_name),
            a,
            b,
            c,
            d,
            e,
            f,
            g,
        ])?;
        inserted += u64::try_from(rows).unwrap_or(0);
    }

    Ok(inserted)
}

/// Returns every statistic in `tables`, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list(conn: &Connection, tables: TableSet) -> Result<Vec<RegionStatistic>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} ORDER BY id",
        select_columns(),
        tables.statistics()
    ))?;
    let rows = stmt.query_map([], from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Returns the live statistic whose normalized name equals `key`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_by_key(conn: &Connection, key: &str) -> Result<Option<RegionStatistic>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE region_key = ? ORDER BY id LIMIT 1",
        select_columns(),
        TableSet::Live.statistics()
    ))?;
    match stmt.query_row([key], from_row) {
        Ok(statistic) => Ok(Some(statistic)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Names of statistics in `tables` with no boundary of the same
/// normalized name, ordered by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn orphaned_names(conn: &Connection, tables: TableSet) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT s.region_name FROM {stats} s
         LEFT JOIN {bounds} b ON b.region_key = s.region_key
         WHERE b.id IS NULL
         ORDER BY s.id",
        stats = tables.statistics(),
        bounds = tables.boundaries(),
    ))?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Every live boundary with its statistic, if any, ordered by boundary
/// id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn boundaries_with_statistics(
    conn: &Connection,
) -> Result<Vec<(AdministrativeBoundary, Option<RegionStatistic>)>, DbError> {
    let stat_columns = StatisticValues::COLUMNS
        .iter()
        .map(|column| format!("s.{column}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn.prepare(&format!(
        "SELECT b.id, b.region_name, b.boundary_geojson,
                b.min_lon, b.min_lat, b.max_lon, b.max_lat,
                s.id, s.region_name, {stat_columns}
         FROM {bounds} b
         LEFT JOIN {stats} s ON s.region_key = b.region_key
         ORDER BY b.id, s.id",
        bounds = TableSet::Live.boundaries(),
        stats = TableSet::Live.statistics(),
    ))?;

    let rows = stmt.query_map([], |row| {
        let boundary = AdministrativeBoundary {
            id: row.get(0)?,
            region_name: row.get(1)?,
            boundary_geojson: row.get(2)?,
            bbox: siting_map_energy_models::BoundingBox::new(
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ),
        };
        let statistic = match row.get::<_, Option<i64>>(7)? {
            Some(id) => Some(RegionStatistic {
                id,
                region_name: row.get(8)?,
                values: values_from_row(row, 9)?,
            }),
            None => None,
        };
        Ok((boundary, statistic))
    })?;

    let mut joined: Vec<(AdministrativeBoundary, Option<RegionStatistic>)> = Vec::new();
    for row in rows {
        let (boundary, statistic) = row?;
        if joined.last().is_some_and(|(last, _)| last.id == boundary.id) {
            continue;
        }
        joined.push((boundary, statistic));
    }

    Ok(joined)
}

/// Returns the number of statistics in `tables`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count(conn: &Connection, tables: TableSet) -> Result<u64, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM {}", tables.statistics()))?;
    let count: i64 = stmt.query_row([], |row| row.get(0))?;
    Ok(crate::count_to_u64(count))
}

fn from_row(row: &Row<'_>) -> duckdb::Result<RegionStatistic> {
    Ok(RegionStatistic {
        id: row.get(0)?,
        region_name: row.get(1)?,
        values: values_from_row(row, 2)?,
    })
}

fn values_from_row(row: &Row<'_>, offset: usize) -> duckdb::Result<StatisticValues> {
    let mut values = [None; 7];
    for (i, value) in values.iter_mut().enumerate() {
        *value = row.get::<_, Option<f64>>(offset + i)?;
    }
    Ok(StatisticValues::from_array(values))
}
