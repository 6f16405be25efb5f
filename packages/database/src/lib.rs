#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for administrative boundaries and region statistics.
//!
//! Boundaries keep their geometry as `GeoJSON` TEXT with precomputed
//! bounding-box columns so point lookups can prefilter in SQL before the
//! exact containment test runs in process. Statistics are joined to
//! boundaries by normalized region name; the join is logical and not
//! enforced by the schema.
//!
//! Both tables have a `_staging` twin that the sync pipeline fills before
//! swapping its contents into the live tables in one transaction.

pub mod boundaries;
pub mod meta;
pub mod paths;
pub mod pool;
pub mod schema;
pub mod statistics;

use duckdb::Connection;

pub use pool::DuckDbPool;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A connection pool lock was poisoned.
    #[error("Connection pool poisoned")]
    PoolPoisoned,

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Which pair of tables an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSet {
    /// The tables request handlers read.
    Live,
    /// The tables the sync pipeline fills before swapping.
    Staging,
}

impl TableSet {
    /// Name of the boundary table.
    #[must_use]
    pub const fn boundaries(self) -> &'static str {
        match self {
            Self::Live => "administrative_boundaries",
            Self::Staging => "administrative_boundaries_staging",
        }
    }

    /// Name of the statistics table.
    #[must_use]
    pub const fn statistics(self) -> &'static str {
        match self {
            Self::Live => "region_statistics",
            Self::Staging => "region_statistics_staging",
        }
    }
}

/// Runs `f` inside a transaction, committing on `Ok` and rolling back on
/// `Err`.
///
/// # Errors
///
/// Returns the error from `f`, or [`DbError`] if the transaction cannot be
/// opened or committed.
pub fn in_transaction<T, E>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<DbError>,
{
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| E::from(DbError::from(e)))?;

    match f(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")
                .map_err(|e| E::from(DbError::from(e)))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                log::error!("Failed to roll back transaction: {rollback}");
            }
            Err(e)
        }
    }
}

#[allow(clippy::cast_sign_loss)]
const fn count_to_u64(count: i64) -> u64 {
    if count < 0 { 0 } else { count as u64 }
}
