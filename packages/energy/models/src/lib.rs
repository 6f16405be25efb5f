#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Renewable resource layer taxonomy and shared economic models.
//!
//! This crate defines the fixed set of raster layers served by the siting
//! map, the territory bounding box every coordinate request is validated
//! against, and the linear levelized-cost-of-energy models derived from
//! suitability scores. Both the raster sampling path and the region
//! statistics path depend on these definitions so the two answer with the
//! same vocabulary.

pub mod lcoe;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use lcoe::Lcoe;

/// One of the fixed raster layers the siting map samples.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LayerName {
    /// Composite solar suitability score.
    SolarMeanScore,
    /// Composite wind suitability score.
    WindMeanScore,
    /// Global horizontal irradiance.
    MeanGhi,
    /// Mean wind speed in metres per second.
    MeanWindSpeedMs,
    /// Mean wind power density.
    MeanWpd,
    /// Terrain slope.
    Slope,
}

impl LayerName {
    /// Every configured layer, in response order.
    pub const ALL: &[Self] = &[
        Self::SolarMeanScore,
        Self::WindMeanScore,
        Self::MeanGhi,
        Self::MeanWindSpeedMs,
        Self::MeanWpd,
        Self::Slope,
    ];

    /// File name of this layer's `GeoTIFF` inside the raster directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::SolarMeanScore => "Solar_Potential_Final_Map.tif",
            Self::WindMeanScore => "Wind_Potential_Final_Map.tif",
            Self::MeanGhi => "GHI.tif",
            Self::MeanWindSpeedMs => "Wind_Speed.tif",
            Self::MeanWpd => "WPD.tif",
            Self::Slope => "Slopes.tif",
        }
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `true` if the point lies strictly inside the box.
    ///
    /// Edges are excluded, and so is any non-finite coordinate.
    #[must_use]
    pub fn contains_strict(&self, lon: f64, lat: f64) -> bool {
        self.west < lon && lon < self.east && self.south < lat && lat < self.north
    }
}

/// The territory every coordinate request must fall within.
pub const TERRITORY: BoundingBox = BoundingBox::new(40.5, -2.0, 51.5, 12.0);

/// A coordinate failed validation before any data was touched.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    /// The point lies outside [`TERRITORY`].
    #[error("Coordinates ({lon}, {lat}) are outside the territory bounds")]
    OutOfTerritory {
        /// Requested longitude.
        lon: f64,
        /// Requested latitude.
        lat: f64,
    },
}

/// Validates that `(lon, lat)` lies inside [`TERRITORY`].
///
/// # Errors
///
/// Returns [`CoordinateError::OutOfTerritory`] if it does not.
pub fn validate_coordinate(lon: f64, lat: f64) -> Result<(), CoordinateError> {
    if TERRITORY.contains_strict(lon, lat) {
        Ok(())
    } else {
        Err(CoordinateError::OutOfTerritory { lon, lat })
    }
}
