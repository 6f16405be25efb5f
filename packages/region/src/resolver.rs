//! Region lookup by name or by point.

use duckdb::Connection;
use geo::Contains;
use siting_map_database::{boundaries, statistics};
use siting_map_energy_models::validate_coordinate;
use siting_map_region_models::{
    AdministrativeBoundary, NameReconciliationMap, RegionMetrics, normalize_region_name,
};

use crate::RegionError;
use crate::spatial::parse_geojson_to_multipolygon;

/// One of the two lookup modes.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionQuery {
    /// Look up a region by name.
    ByName(String),
    /// Look up the region containing a WGS84 point.
    ByPoint {
        /// Longitude.
        lon: f64,
        /// Latitude.
        lat: f64,
    },
}

impl RegionQuery {
    /// Builds a query from optional request parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::InvalidQuery`] if neither or both modes are
    /// supplied, or if only one coordinate is supplied. A blank name counts
    /// as no name.
    pub fn from_params(
        name: Option<&str>,
        lat: Option<f64>,
        lon: Option<f64>,
    ) -> Result<Self, RegionError> {
        let name = name.filter(|name| !name.trim().is_empty());

        match (name, lat, lon) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(RegionError::InvalidQuery(
                "Provide either a region name or coordinates, not both".to_string(),
            )),
            (Some(name), None, None) => Ok(Self::ByName(name.to_string())),
            (None, Some(lat), Some(lon)) => Ok(Self::ByPoint { lon, lat }),
            (None, Some(_), None) | (None, None, Some(_)) => Err(RegionError::InvalidQuery(
                "Both lat and lon are required".to_string(),
            )),
            (None, None, None) => Err(RegionError::InvalidQuery(
                "Provide either a region name or lat and lon".to_string(),
            )),
        }
    }
}

/// Resolves `query` against the live stores.
///
/// # Errors
///
/// See [`find_by_name`] and [`find_by_point`].
pub fn resolve(
    conn: &Connection,
    query: &RegionQuery,
    aliases: &NameReconciliationMap,
) -> Result<RegionMetrics, RegionError> {
    match query {
        RegionQuery::ByName(name) => find_by_name(conn, name, aliases),
        RegionQuery::ByPoint { lon, lat } => find_by_point(conn, *lon, *lat),
    }
}

/// Finds a region by name.
///
/// Names match exactly after normalization. If nothing matches, the
/// reconciliation alias of `name` is tried. A boundary without a statistic
/// row resolves to all-null metrics.
///
/// # Errors
///
/// * [`RegionError::InvalidQuery`] if `name` is blank
/// * [`RegionError::NotFound`] if no region matches
/// * [`RegionError::Database`] if a query fails
pub fn find_by_name(
    conn: &Connection,
    name: &str,
    aliases: &NameReconciliationMap,
) -> Result<RegionMetrics, RegionError> {
    let key = normalize_region_name(name);
    if key.is_empty() {
        return Err(RegionError::InvalidQuery("Region name is empty".to_string()));
    }

    let mut candidates = vec![key];
    if let Some(alias) = aliases.alias(name) {
        let alias_key = normalize_region_name(alias);
        if !candidates.contains(&alias_key) {
            candidates.push(alias_key);
        }
    }

    for key in &candidates {
        if let Some(statistic) = statistics::find_by_key(conn, key)? {
            return Ok(RegionMetrics::from_statistic(statistic));
        }
        if let Some(boundary) = boundaries::find_by_key(conn, key)? {
            return metrics_for_boundary(conn, boundary);
        }
    }

    Err(RegionError::NotFound(format!("No region named {:?}", name.trim())))
}

/// Finds the region containing `(lon, lat)`.
///
/// Boundaries are prefiltered by bounding box in SQL and then tested for
/// exact containment. If several contain the point, the lowest id wins.
///
/// # Errors
///
/// * [`RegionError::Coordinate`] if the point is outside the territory
/// * [`RegionError::NotFound`] if no boundary contains the point
/// * [`RegionError::Database`] if a query fails
pub fn find_by_point(conn: &Connection, lon: f64, lat: f64) -> Result<RegionMetrics, RegionError> {
    validate_coordinate(lon, lat)?;

    let point = geo::Point::new(lon, lat);
    let containing: Vec<AdministrativeBoundary> = boundaries::bbox_candidates(conn, lon, lat)?
        .into_iter()
        .filter(|boundary| {
            parse_geojson_to_multipolygon(&boundary.boundary_geojson).map_or_else(
                || {
                    log::warn!(
                        "Failed to parse geometry of boundary {} ({})",
                        boundary.id,
                        boundary.region_name
                    );
                    false
                },
                |polygon| polygon.contains(&point),
            )
        })
        .collect();

    if containing.len() > 1 {
        log::warn!(
            "({lon}, {lat}) lies in {} overlapping boundaries ({}), using the lowest id",
            containing.len(),
            containing
                .iter()
                .map(|b| b.region_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let boundary = containing
        .into_iter()
        .next()
        .ok_or_else(|| RegionError::NotFound(format!("No region contains ({lon}, {lat})")))?;

    metrics_for_boundary(conn, boundary)
}

fn metrics_for_boundary(
    conn: &Connection,
    boundary: AdministrativeBoundary,
) -> Result<RegionMetrics, RegionError> {
    match statistics::find_by_key(conn, &normalize_region_name(&boundary.region_name))? {
        Some(statistic) => Ok(RegionMetrics::from_statistic(statistic)),
        None => {
            log::warn!(
                "Boundary {} ({}) has no statistics",
                boundary.id,
                boundary.region_name
            );
            Ok(RegionMetrics::without_statistics(boundary.region_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use siting_map_database::TableSet;
    use siting_map_region_models::{RegionStatistic, StatisticValues};

    use super::*;
    use crate::test_support::{seeded, square};

    const MOGADISHU: (f64, f64) = (45.3182, 2.0469);

    #[test]
    fn parses_query_modes() {
        assert_eq!(
            RegionQuery::from_params(Some("Puntland"), None, None).unwrap(),
            RegionQuery::ByName("Puntland".to_string())
        );
        assert_eq!(
            RegionQuery::from_params(None, Some(2.0), Some(45.0)).unwrap(),
            RegionQuery::ByPoint { lon: 45.0, lat: 2.0 }
        );
    }

    #[test]
    fn rejects_ambiguous_or_incomplete_queries() {
        assert!(RegionQuery::from_params(None, None, None).is_err());
        assert!(RegionQuery::from_params(Some("Puntland"), Some(2.0), Some(45.0)).is_err());
        assert!(RegionQuery::from_params(None, Some(2.0), None).is_err());
        assert!(RegionQuery::from_params(Some("  "), None, None).is_err());
    }

    #[test]
    fn blank_name_falls_through_to_point() {
        assert_eq!(
            RegionQuery::from_params(Some(""), Some(2.0), Some(45.0)).unwrap(),
            RegionQuery::ByPoint { lon: 45.0, lat: 2.0 }
        );
    }

    #[test]
    fn finds_by_exact_normalized_name() {
        let conn = seeded();
        let metrics = find_by_name(&conn, "  puntland ", &NameReconciliationMap::default()).unwrap();
        assert_eq!(metrics.region_name, "Puntland");
        assert_eq!(metrics.values.solar_mean_score, Some(8.0));
        assert_eq!(metrics.lcoe.lcoe_solar, Some(0.11));
    }

    #[test]
    fn falls_back_to_reconciliation_alias() {
        let conn = seeded();
        let metrics = find_by_name(&conn, "Banadir", &NameReconciliationMap::default()).unwrap();
        assert_eq!(metrics.region_name, "Banadir Regional Admin");
    }

    #[test]
    fn does_not_match_substrings() {
        let conn = seeded();
        let result = find_by_name(&conn, "Punt", &NameReconciliationMap::default());
        assert!(matches!(result, Err(RegionError::NotFound(_))));
    }

    #[test]
    fn boundary_without_statistics_is_all_null() {
        let conn = seeded();
        let metrics = find_by_name(&conn, "Jubaland", &NameReconciliationMap::default()).unwrap();
        assert_eq!(metrics.id, None);
        assert!(metrics.values.to_array().iter().all(Option::is_none));
        assert_eq!(metrics.lcoe.lcoe_solar, None);
    }

    #[test]
    fn finds_region_containing_point() {
        let conn = seeded();
        let metrics = find_by_point(&conn, MOGADISHU.0, MOGADISHU.1).unwrap();
        assert_eq!(metrics.region_name, "Banadir Regional Admin");
        assert_eq!(metrics.values.wind_mean_score, Some(5.0));
        assert_eq!(metrics.lcoe.lcoe_wind, Some(0.1));
    }

    #[test]
    fn point_outside_all_boundaries_is_not_found() {
        let conn = seeded();
        assert!(matches!(
            find_by_point(&conn, 50.5, 0.5),
            Err(RegionError::NotFound(_))
        ));
    }

    #[test]
    fn point_outside_territory_is_rejected() {
        let conn = seeded();
        assert!(matches!(
            find_by_point(&conn, 30.0, 2.0),
            Err(RegionError::Coordinate(_))
        ));
    }

    #[test]
    fn overlapping_boundaries_resolve_to_lowest_id() {
        let conn = seeded();
        boundaries::insert_all(&conn, TableSet::Live, &[square(0, "Overlay", 45.0, 1.5, 46.0, 2.5)]).unwrap();
        statistics::insert_all(
            &conn,
            TableSet::Live,
            &[RegionStatistic {
                id: 99,
                region_name: "Overlay".to_string(),
                values: StatisticValues::default(),
            }],
        )
        .unwrap();

        let metrics = find_by_point(&conn, MOGADISHU.0, MOGADISHU.1).unwrap();
        assert_eq!(metrics.region_name, "Overlay");
    }

    #[test]
    fn resolve_dispatches_on_mode() {
        let conn = seeded();
        let aliases = NameReconciliationMap::default();
        let by_point = resolve(&conn, &RegionQuery::ByPoint { lon: 49.0, lat: 9.0 }, &aliases).unwrap();
        let by_name = resolve(&conn, &RegionQuery::ByName("Puntland".to_string()), &aliases).unwrap();
        assert_eq!(by_point, by_name);
    }
}
