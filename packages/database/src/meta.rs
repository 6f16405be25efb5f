//! Key/value metadata recorded alongside the stores.

use chrono::{DateTime, Utc};
use duckdb::Connection;

use crate::DbError;

/// Key of the last successful sync timestamp.
pub const LAST_SYNC_AT: &str = "last_sync_at";

/// Gets a metadata value from the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare("SELECT value FROM _meta WHERE key = ?")?;
    let result = stmt.query_row([key], |row| row.get(0));
    match result {
        Ok(v) => Ok(Some(v)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(DbError::DuckDb(e)),
    }
}

/// Sets a metadata value in the `_meta` table.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO _meta (key, value) VALUES (?, ?)
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        duckdb::params![key, value],
    )?;
    Ok(())
}

/// Records `at` as the last successful sync.
///
/// # Errors
///
/// Returns [`DbError`] if the upsert fails.
pub fn record_sync(conn: &Connection, at: DateTime<Utc>) -> Result<(), DbError> {
    set_meta(conn, LAST_SYNC_AT, &at.to_rfc3339())
}

/// Returns the last successful sync time, or `None` if the stores were
/// never synced.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored value is not a
/// valid RFC 3339 timestamp.
pub fn last_sync_at(conn: &Connection) -> Result<Option<DateTime<Utc>>, DbError> {
    get_meta(conn, LAST_SYNC_AT)?
        .map(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| DbError::Conversion {
                    message: format!("Invalid {LAST_SYNC_AT} value {value:?}: {e}"),
                })
        })
        .transpose()
}
