//! Connection opening and schema management.

use std::path::Path;

use duckdb::Connection;

use crate::{DbError, TableSet};

/// Opens (or creates) the store at `path` and ensures the live schema
/// exists.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent() {
        crate::paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;

    conn.execute_batch("SET threads = 4; SET memory_limit = '512MB';")?;

    create_schema(&conn)?;

    Ok(conn)
}

/// Opens an in-memory store with the live schema.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Opens an existing store read-only.
///
/// # Errors
///
/// Returns [`DbError`] if the file does not exist or cannot be opened.
pub fn open_read_only(path: &Path) -> Result<Connection, DbError> {
    let config = duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?;
    Ok(Connection::open_with_flags(path, config)?)
}

/// Creates the live tables and the `_meta` table if they do not exist.
///
/// Live tables carry no key constraints; uniqueness is enforced on the
/// staging tables before their contents are swapped in.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(&format!(
        "{}
        {}
        CREATE TABLE IF NOT EXISTS _meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
        boundary_table_ddl(TableSet::Live),
        statistics_table_ddl(TableSet::Live),
    ))?;

    Ok(())
}

/// Drops and recreates the staging tables.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn prepare_staging(conn: &Connection) -> Result<(), DbError> {
    drop_staging(conn)?;
    conn.execute_batch(&format!(
        "{}
        {}",
        boundary_table_ddl(TableSet::Staging),
        statistics_table_ddl(TableSet::Staging),
    ))?;

    Ok(())
}

/// Drops the staging tables if they exist.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn drop_staging(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {};
         DROP TABLE IF EXISTS {};",
        TableSet::Staging.statistics(),
        TableSet::Staging.boundaries(),
    ))?;

    Ok(())
}

/// Replaces the live table contents with the staging contents.
///
/// Does not open a transaction; callers wrap this together with anything
/// else that must become visible atomically.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn promote_staging(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(&format!(
        "DELETE FROM {live_stats};
         DELETE FROM {live_bounds};
         INSERT INTO {live_bounds} SELECT * FROM {staging_bounds} ORDER BY id;
         INSERT INTO {live_stats} SELECT * FROM {staging_stats} ORDER BY id;",
        live_stats = TableSet::Live.statistics(),
        live_bounds = TableSet::Live.boundaries(),
        staging_bounds = TableSet::Staging.boundaries(),
        staging_stats = TableSet::Staging.statistics(),
    ))?;

    Ok(())
}

/// Clears both live tables in one transaction.
///
/// # Errors
///
/// Returns [`DbError`] if the transaction fails.
pub fn reset(conn: &Connection) -> Result<(), DbError> {
    crate::in_transaction(conn, |conn| -> Result<(), DbError> {
        conn.execute_batch(&format!(
            "DELETE FROM {};
             DELETE FROM {};",
            TableSet::Live.statistics(),
            TableSet::Live.boundaries(),
        ))?;
        Ok(())
    })?;

    log::info!("Cleared boundary and statistics tables");
    Ok(())
}

fn boundary_table_ddl(tables: TableSet) -> String {
    let constraints = match tables {
        TableSet::Live => "",
        TableSet::Staging => ",\n            PRIMARY KEY (id),\n            UNIQUE (region_key)",
    };

    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGINT NOT NULL,
            region_name TEXT NOT NULL,
            region_key TEXT NOT NULL,
            srid INTEGER NOT NULL,
            boundary_geojson TEXT NOT NULL,
            min_lon DOUBLE NOT NULL,
            min_lat DOUBLE NOT NULL,
            max_lon DOUBLE NOT NULL,
            max_lat DOUBLE NOT NULL{constraints}
        );",
        tables.boundaries(),
    )
}

fn statistics_table_ddl(tables: TableSet) -> String {
    let constraints = match tables {
        TableSet::Live => "",
        TableSet::Staging => ",\n            PRIMARY KEY (id),\n            UNIQUE (region_key)",
    };

    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGINT NOT NULL,
            region_name TEXT NOT NULL,
            region_key TEXT NOT NULL,
            mean_ghi DOUBLE,
            mean_wpd DOUBLE,
            mean_wind_speed_ms DOUBLE,
            solar_highly_suitable_km2 DOUBLE,
            solar_mean_score DOUBLE,
            wind_highly_suitable_km2 DOUBLE,
            wind_mean_score DOUBLE{constraints}
        );",
        tables.statistics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.prepare("SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?")
            .unwrap()
            .query_row([name], |row| row.get::<_, i64>(0))
            .unwrap()
            > 0
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let conn = open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        assert!(table_exists(&conn, "administrative_boundaries"));
        assert!(table_exists(&conn, "region_statistics"));
        assert!(table_exists(&conn, "_meta"));
        assert!(!table_exists(&conn, "administrative_boundaries_staging"));
    }

    #[test]
    fn staging_can_be_recreated_and_dropped() {
        let conn = open_in_memory().unwrap();
        prepare_staging(&conn).unwrap();
        prepare_staging(&conn).unwrap();
        assert!(table_exists(&conn, "region_statistics_staging"));

        drop_staging(&conn).unwrap();
        assert!(!table_exists(&conn, "region_statistics_staging"));
        assert!(!table_exists(&conn, "administrative_boundaries_staging"));
    }

    #[test]
    fn staging_rejects_duplicate_region_keys() {
        let conn = open_in_memory().unwrap();
        prepare_staging(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO region_statistics_staging (id, region_name, region_key) VALUES (1, 'A', 'a');",
        )
        .unwrap();

        assert!(
            conn.execute_batch(
                "INSERT INTO region_statistics_staging (id, region_name, region_key) VALUES (2, 'A ', 'a');",
            )
            .is_err()
        );
    }

    #[test]
    fn opens_file_and_reopens_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/siting.duckdb");

        drop(open(&path).unwrap());
        let conn = open_read_only(&path).unwrap();
        assert!(table_exists(&conn, "administrative_boundaries"));
        assert!(conn.execute_batch("DELETE FROM region_statistics").is_err());
    }

    #[test]
    fn read_only_open_of_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_read_only(&dir.path().join("missing.duckdb")).is_err());
    }
}
