#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Administrative boundary and region statistic types.
//!
//! Boundaries and statistics are stored separately and joined by region
//! name. Names from the statistics source do not always match the boundary
//! source, so both sides are compared through [`normalize_region_name`] and
//! statistics names are first passed through a [`NameReconciliationMap`].

pub mod reconcile;

use serde::{Deserialize, Serialize};
use siting_map_energy_models::{BoundingBox, Lcoe};

pub use reconcile::NameReconciliationMap;

/// SRID of every stored boundary geometry (WGS84).
pub const WGS84_SRID: i32 = 4326;

/// An administrative boundary row as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdministrativeBoundary {
    /// Primary key, assigned in source order.
    pub id: i64,
    /// Canonical region name.
    pub region_name: String,
    /// `GeoJSON` `MultiPolygon` geometry in WGS84.
    pub boundary_geojson: String,
    /// Bounding box of the geometry.
    pub bbox: BoundingBox,
}

/// The seven per-region metrics, each independently nullable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticValues {
    /// Mean global horizontal irradiance.
    pub mean_ghi: Option<f64>,
    /// Mean wind power density.
    pub mean_wpd: Option<f64>,
    /// Mean wind speed in metres per second.
    pub mean_wind_speed_ms: Option<f64>,
    /// Area highly suitable for solar, in square kilometres.
    pub solar_highly_suitable_km2: Option<f64>,
    /// Mean solar suitability score.
    pub solar_mean_score: Option<f64>,
    /// Area highly suitable for wind, in square kilometres.
    pub wind_highly_suitable_km2: Option<f64>,
    /// Mean wind suitability score.
    pub wind_mean_score: Option<f64>,
}

impl StatisticValues {
    /// Column names of the metrics, in storage order.
    pub const COLUMNS: [&'static str; 7] = [
        "mean_ghi",
        "mean_wpd",
        "mean_wind_speed_ms",
        "solar_highly_suitable_km2",
        "solar_mean_score",
        "wind_highly_suitable_km2",
        "wind_mean_score",
    ];

    /// Builds the metrics from values in [`Self::COLUMNS`] order.
    #[must_use]
    pub const fn from_array(values: [Option<f64>; 7]) -> Self {
        let [
            mean_ghi,
            mean_wpd,
            mean_wind_speed_ms,
            solar_highly_suitable_km2,
            solar_mean_score,
            wind_highly_suitable_km2,
            wind_mean_score,
        ] = values;

        Self {
            mean_ghi,
            mean_wpd,
            mean_wind_speed_ms,
            solar_highly_suitable_km2,
            solar_mean_score,
            wind_highly_suitable_km2,
            wind_mean_score,
        }
    }

    /// The metrics in [`Self::COLUMNS`] order.
    #[must_use]
    pub const fn to_array(&self) -> [Option<f64>; 7] {
        [
            self.mean_ghi,
            self.mean_wpd,
            self.mean_wind_speed_ms,
            self.solar_highly_suitable_km2,
            self.solar_mean_score,
            self.wind_highly_suitable_km2,
            self.wind_mean_score,
        ]
    }

    /// LCOE derived from the solar and wind mean scores.
    #[must_use]
    pub fn lcoe(&self) -> Lcoe {
        Lcoe::from_scores(self.solar_mean_score, self.wind_mean_score)
    }
}

/// A region statistic row as stored in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStatistic {
    /// Primary key, assigned in source order.
    pub id: i64,
    /// Region name after reconciliation.
    pub region_name: String,
    /// The metrics.
    #[serde(flatten)]
    pub values: StatisticValues,
}

/// The answer to a region lookup: the matched region, its metrics, and the
/// derived LCOE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    /// Statistic row id, `None` if the boundary has no statistics.
    pub id: Option<i64>,
    /// Canonical region name.
    pub region_name: String,
    /// The metrics; all `None` if the region has no statistics.
    #[serde(flatten)]
    pub values: StatisticValues,
    /// Derived LCOE.
    #[serde(flatten)]
    pub lcoe: Lcoe,
}

impl RegionMetrics {
    /// Builds the metrics of a region with a statistic row.
    #[must_use]
    pub fn from_statistic(statistic: RegionStatistic) -> Self {
        Self {
            id: Some(statistic.id),
            lcoe: statistic.values.lcoe(),
            region_name: statistic.region_name,
            values: statistic.values,
        }
    }

    /// Builds the all-null metrics of a boundary without statistics.
    #[must_use]
    pub fn without_statistics(region_name: String) -> Self {
        Self {
            id: None,
            region_name,
            values: StatisticValues::default(),
            lcoe: Lcoe::default(),
        }
    }
}

/// Normalizes a region name for comparison: trims, collapses internal
/// whitespace, and lowercases.
#[must_use]
pub fn normalize_region_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_region_name("  Banadir   Regional\tAdmin "), "banadir regional admin");
        assert_eq!(normalize_region_name("PUNTLAND"), "puntland");
        assert_eq!(normalize_region_name("   "), "");
    }

    #[test]
    fn metrics_round_trip_through_column_order() {
        let values = [Some(1.0), None, Some(3.0), Some(4.0), Some(5.0), None, Some(7.0)];
        assert_eq!(StatisticValues::from_array(values).to_array(), values);
        assert_eq!(StatisticValues::from_array(values).solar_mean_score, Some(5.0));
    }

    #[test]
    fn lcoe_follows_scores() {
        let values = StatisticValues {
            solar_mean_score: Some(10.0),
            ..StatisticValues::default()
        };
        let lcoe = values.lcoe();
        assert_eq!(lcoe.lcoe_solar, Some(0.1));
        assert_eq!(lcoe.lcoe_wind, None);
    }

    #[test]
    fn region_without_statistics_is_all_null() {
        let metrics = RegionMetrics::without_statistics("Somaliland".to_string());
        assert_eq!(metrics.id, None);
        assert!(metrics.values.to_array().iter().all(Option::is_none));
        assert_eq!(metrics.lcoe, Lcoe::default());
    }

    #[test]
    fn region_metrics_serialize_flat() {
        let metrics = RegionMetrics::from_statistic(RegionStatistic {
            id: 3,
            region_name: "Puntland".to_string(),
            values: StatisticValues {
                wind_mean_score: Some(5.0),
                ..StatisticValues::default()
            },
        });

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["region_name"], "Puntland");
        assert_eq!(json["wind_mean_score"], 5.0);
        assert_eq!(json["lcoe_wind"], 0.1);
        assert!(json["mean_ghi"].is_null());
    }
}
