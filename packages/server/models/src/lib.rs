#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the siting map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the store row types so the API contract can evolve independently.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siting_map_energy_models::{LayerName, Lcoe};
use siting_map_region_models::{RegionMetrics, StatisticValues};

/// Query parameters for the pixel report endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PixelQuery {
    /// Longitude (WGS84).
    pub lon: Option<f64>,
    /// Latitude (WGS84).
    pub lat: Option<f64>,
}

/// Query parameters for the region metrics endpoint.
///
/// Exactly one mode must be supplied: `state`, or both `lat` and `lon`.
#[derive(Debug, Clone, Deserialize)]
pub struct StateMetricsQuery {
    /// Region name.
    pub state: Option<String>,
    /// Latitude (WGS84).
    pub lat: Option<f64>,
    /// Longitude (WGS84).
    pub lon: Option<f64>,
}

/// A region's statistics as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRegionMetrics {
    /// Statistic row id, `null` if the boundary has no statistics.
    pub id: Option<i64>,
    /// Canonical region name.
    pub state_name: String,
    /// The seven metrics.
    #[serde(flatten)]
    pub values: StatisticValues,
    /// `lcoe_solar` and `lcoe_wind`.
    #[serde(flatten)]
    pub lcoe: Lcoe,
}

impl From<RegionMetrics> for ApiRegionMetrics {
    fn from(metrics: RegionMetrics) -> Self {
        Self {
            id: metrics.id,
            state_name: metrics.region_name,
            values: metrics.values,
            lcoe: metrics.lcoe,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiHealth {
    /// Always `"ok"` when the API answers.
    pub api: String,
    /// Service version.
    pub version: String,
    /// `"ok"`, or `"error: ..."` if the store is unreachable.
    pub database: String,
    /// Per-layer status: `"ok"`, `"missing"`, or `"error: ..."`.
    pub rasters: BTreeMap<LayerName, String>,
    /// When the boundary and statistics tables were last rebuilt.
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    /// Builds an error body.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// A hub town shown on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MajorTown {
    /// Town name.
    pub name: &'static str,
    /// Role of the town, e.g. "Port City".
    pub kind: &'static str,
    /// Population estimate as published.
    pub population: &'static str,
    /// Key infrastructure.
    pub infrastructure: &'static str,
    /// Source of the figures.
    pub source: &'static str,
    /// Link to the source.
    pub source_url: &'static str,
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
}

const WORLD_BANK_SURP: &str =
    "https://projects.worldbank.org/en/projects-operations/project-detail/P170922";
const NBS: &str = "https://www.nbs.gov.so/";

/// The six hub towns.
pub const MAJOR_TOWNS: [MajorTown; 6] = [
    MajorTown {
        name: "Mogadishu",
        kind: "National Capital",
        population: "2,610,483",
        infrastructure: "Major International Port & Airport",
        source: "World Bank SURP II",
        source_url: WORLD_BANK_SURP,
        lon: 45.3182,
        lat: 2.0469,
    },
    MajorTown {
        name: "Hargeisa",
        kind: "Major Economic Hub",
        population: "1,200,000",
        infrastructure: "Inland Logistics & Trade Hub",
        source: "NBS Statistical Yearbook",
        source_url: NBS,
        lon: 44.0650,
        lat: 9.5624,
    },
    MajorTown {
        name: "Bosaso",
        kind: "Port City",
        population: "700,000",
        infrastructure: "Primary Maritime Export Hub",
        source: "Puntland NBS Survey",
        source_url: NBS,
        lon: 49.1816,
        lat: 11.2842,
    },
    MajorTown {
        name: "Kismayo",
        kind: "Strategic Port City",
        population: "183,000",
        infrastructure: "Deepwater Port Hub",
        source: "World Bank Somalia Urban Profile",
        source_url: WORLD_BANK_SURP,
        lon: 42.5454,
        lat: -0.3582,
    },
    MajorTown {
        name: "Baidoa",
        kind: "Regional Agri-Hub",
        population: "800,000",
        infrastructure: "Agricultural Trade Node",
        source: "UN-OCHA Pop. Estimates",
        source_url: "https://data.humdata.org/group/som",
        lon: 43.6492,
        lat: 3.1133,
    },
    MajorTown {
        name: "Garowe",
        kind: "Administrative Capital",
        population: "190,000",
        infrastructure: "Governmental and Logistics Node",
        source: "Puntland NBS Office",
        source_url: NBS,
        lon: 48.4845,
        lat: 8.4064,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_metrics_serialize_flat_with_state_name() {
        let api = ApiRegionMetrics::from(RegionMetrics {
            id: Some(2),
            region_name: "Puntland".to_string(),
            values: StatisticValues {
                solar_mean_score: Some(8.0),
                ..StatisticValues::default()
            },
            lcoe: Lcoe::from_scores(Some(8.0), None),
        });

        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["state_name"], "Puntland");
        assert_eq!(json["solar_mean_score"], 8.0);
        assert_eq!(json["lcoe_solar"], 0.11);
        assert!(json["lcoe_wind"].is_null());
        assert!(json["mean_ghi"].is_null());
        assert!(json.get("region_name").is_none());
    }

    #[test]
    fn every_town_lies_in_the_territory() {
        for town in MAJOR_TOWNS {
            assert!(
                siting_map_energy_models::validate_coordinate(town.lon, town.lat).is_ok(),
                "{}",
                town.name
            );
        }
    }
}
