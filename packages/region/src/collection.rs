//! The boundary `FeatureCollection` served to the map client.

use duckdb::Connection;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue, feature::Id};
use siting_map_database::statistics;
use siting_map_region_models::StatisticValues;

use crate::RegionError;

/// Builds a `FeatureCollection` of every live boundary with its joined
/// statistics as properties (`id`, `state_name`, and the seven metrics).
///
/// A boundary without statistics carries null metrics. A boundary whose
/// stored geometry fails to parse is skipped with a warning.
///
/// # Errors
///
/// Returns [`RegionError::Database`] if the query fails.
pub fn states_feature_collection(conn: &Connection) -> Result<FeatureCollection, RegionError> {
    let joined = statistics::boundaries_with_statistics(conn)?;
    let mut features = Vec::with_capacity(joined.len());

    for (boundary, statistic) in joined {
        let geometry = match boundary.boundary_geojson.parse::<GeoJson>() {
            Ok(GeoJson::Geometry(geometry)) => geometry,
            Ok(_) | Err(_) => {
                log::warn!(
                    "Skipping boundary {} ({}): stored geometry is not a GeoJSON geometry",
                    boundary.id,
                    boundary.region_name
                );
                continue;
            }
        };

        let values = statistic.map(|s| s.values).unwrap_or_default();

        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), JsonValue::from(boundary.id));
        properties.insert(
            "state_name".to_string(),
            JsonValue::from(boundary.region_name.clone()),
        );
        for (column, value) in StatisticValues::COLUMNS.iter().zip(values.to_array()) {
            properties.insert((*column).to_string(), JsonValue::from(value));
        }

        features.push(Feature {
            bbox: None,
            geometry: Some(geometry),
            id: Some(Id::Number(boundary.id.into())),
            properties: Some(properties),
            foreign_members: None,
        });
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
