#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the data directory.
//!
//! All defaults are relative to the project root's `data/` directory and
//! can be overridden by the environment variables the binaries read.

use std::path::{Path, PathBuf};

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`, falling back to the
/// current directory if the manifest is not nested as expected.
#[must_use]
pub fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    project_root().join("data")
}

/// Returns the `data/shared/` directory for the `DuckDB` store.
#[must_use]
pub fn shared_dir() -> PathBuf {
    data_dir().join("shared")
}

/// Returns the `data/sources/` directory for sync inputs.
#[must_use]
pub fn sources_dir() -> PathBuf {
    data_dir().join("sources")
}

/// Default path of the `DuckDB` store.
#[must_use]
pub fn database_path() -> PathBuf {
    shared_dir().join("siting.duckdb")
}

/// Default directory of the raster layers.
#[must_use]
pub fn raster_dir() -> PathBuf {
    data_dir().join("rasters")
}

/// Default boundary source: a script assigning a `GeoJSON`
/// `FeatureCollection` to a variable.
#[must_use]
pub fn boundary_source_path() -> PathBuf {
    sources_dir().join("FederalStates_1.js")
}

/// Default per-region statistics CSV.
#[must_use]
pub fn statistics_source_path() -> PathBuf {
    sources_dir().join("Final_State_Statistics.csv")
}

/// Resolves `var` from the environment, or `default` if unset or empty.
#[must_use]
pub fn from_env_or(var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map_or_else(default, PathBuf::from)
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
