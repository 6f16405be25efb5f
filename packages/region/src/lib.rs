#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Region resolution against the boundary and statistics stores.
//!
//! A region is found either by name (exact after normalization, with the
//! reconciliation alias as a fallback) or by the point it contains
//! (bounding-box prefilter in SQL, exact containment with `geo`). Either
//! way the answer is the region's statistic row plus derived LCOE.

pub mod collection;
pub mod resolver;
pub mod spatial;

use siting_map_database::DbError;
use siting_map_energy_models::CoordinateError;

pub use collection::states_feature_collection;
pub use resolver::{RegionQuery, find_by_name, find_by_point, resolve};

/// Errors from region lookups.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    /// The request did not specify exactly one valid lookup mode.
    #[error("{0}")]
    InvalidQuery(String),

    /// The coordinate failed validation.
    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    /// No region matched.
    #[error("{0}")]
    NotFound(String),

    /// Store error.
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<duckdb::Error> for RegionError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(DbError::DuckDb(e))
    }
}
