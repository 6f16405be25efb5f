#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Raster layer access and point sampling.
//!
//! [`RasterCatalog`] opens the fixed set of `GeoTIFF` layers once at
//! startup. [`PointSampler`] answers point queries against it, projecting
//! each WGS84 request into every layer's native CRS through a shared
//! [`ReprojectionCache`] before reading a single band-1 pixel.

pub mod audit;
pub mod catalog;
pub mod crs;
pub mod geotiff;
pub mod reproject;
pub mod sampler;
pub mod source;

use siting_map_energy_models::LayerName;

pub use catalog::{LayerStatus, RasterCatalog};
pub use crs::Crs;
pub use reproject::ReprojectionCache;
pub use sampler::{PixelReport, PointSampler, SampleError};
pub use source::{GeoTransform, RasterMetadata, RasterSource};

/// Values closer than this to a layer's nodata sentinel are nodata.
pub const NODATA_EPSILON: f64 = 1e-10;

/// Errors from opening or reading rasters.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The raster carries no usable pixel-to-model transform.
    #[error("Missing georeference: {reason}")]
    MissingGeoreference {
        /// What was missing.
        reason: String,
    },

    /// The CRS cannot be expressed or transformed.
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// A projection failed to initialize or apply.
    #[error("Projection error: {0}")]
    Projection(String),

    /// Pixel data could not be interpreted.
    #[error("Decode error: {reason}")]
    Decode {
        /// What went wrong.
        reason: String,
    },

    /// A pixel index outside the raster was requested.
    #[error("Pixel ({col}, {row}) is outside the raster")]
    PixelOutOfRange {
        /// Column.
        col: u32,
        /// Row.
        row: u32,
    },

    /// The layer is not open.
    #[error("Raster layer {0} is not available")]
    LayerUnavailable(LayerName),

    /// A lock was poisoned by a panicking holder.
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Returns `true` if `value` is within [`NODATA_EPSILON`] of `nodata`.
///
/// A `NaN` sentinel matches any `NaN` value.
#[must_use]
pub fn is_nodata(value: f64, nodata: f64) -> bool {
    if nodata.is_nan() {
        value.is_nan()
    } else {
        (value - nodata).abs() < NODATA_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodata_matches_within_epsilon() {
        assert!(is_nodata(-9999.0, -9999.0));
        assert!(is_nodata(-9999.0 + 5e-11, -9999.0));
        assert!(!is_nodata(-9999.0 + 1e-6, -9999.0));
    }

    #[test]
    fn nan_sentinel_matches_nan() {
        assert!(is_nodata(f64::NAN, f64::NAN));
        assert!(!is_nodata(1.0, f64::NAN));
    }
}
