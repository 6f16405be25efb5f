//! Parser for the boundary source file.
//!
//! The source is a script that assigns a `GeoJSON` `FeatureCollection` to a
//! variable (`var FederalStates_1 = {...};`). A bare `FeatureCollection` is
//! accepted as well.

use std::collections::BTreeMap;
use std::path::Path;

use geojson::GeoJson;
use siting_map_region::spatial::{bounding_box, geometry_to_multipolygon, multipolygon_to_geojson};
use siting_map_region_models::{AdministrativeBoundary, normalize_region_name};

use crate::SyncError;

/// Default feature property holding the region name.
pub const DEFAULT_NAME_PROPERTY: &str = "States";

/// Reads and parses the boundary source at `path`.
///
/// # Errors
///
/// Returns [`SyncError::Io`] if the file cannot be read, otherwise see
/// [`parse_boundary_source`].
pub fn read_boundary_source(
    path: &Path,
    name_property: &str,
) -> Result<Vec<AdministrativeBoundary>, SyncError> {
    let text = std::fs::read_to_string(path).map_err(|source| SyncError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_boundary_source(&text, name_property)
}

/// Parses boundary rows out of the source text.
///
/// Each feature becomes one boundary with an id assigned in source order
/// starting at 1. `Polygon` geometries are promoted to `MultiPolygon`.
///
/// # Errors
///
/// * [`SyncError::InvalidBoundarySource`] if the text holds no
///   `FeatureCollection`
/// * [`SyncError::MissingName`] if a feature lacks the name property
/// * [`SyncError::InvalidGeometry`] if a geometry is missing, not polygonal,
///   or empty
/// * [`SyncError::DuplicateBoundary`] if two features share a name
pub fn parse_boundary_source(
    text: &str,
    name_property: &str,
) -> Result<Vec<AdministrativeBoundary>, SyncError> {
    let json = embedded_json(text);
    let collection = match json.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => collection,
        Ok(_) => {
            return Err(SyncError::InvalidBoundarySource(
                "expected a FeatureCollection".to_string(),
            ));
        }
        Err(e) => return Err(SyncError::InvalidBoundarySource(e.to_string())),
    };

    let mut seen = BTreeMap::new();
    let mut boundaries = Vec::with_capacity(collection.features.len());

    for (index, feature) in collection.features.into_iter().enumerate() {
        let name = feature
            .property(name_property)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| SyncError::MissingName {
                index,
                property: name_property.to_string(),
            })?
            .to_string();

        if let Some(previous) = seen.insert(normalize_region_name(&name), index) {
            log::error!("Boundary {name:?} appears at features {previous} and {index}");
            return Err(SyncError::DuplicateBoundary(name));
        }

        let polygon = feature
            .geometry
            .and_then(geometry_to_multipolygon)
            .ok_or_else(|| SyncError::InvalidGeometry { name: name.clone() })?;
        let bbox =
            bounding_box(&polygon).ok_or_else(|| SyncError::InvalidGeometry { name: name.clone() })?;

        boundaries.push(AdministrativeBoundary {
            id: i64::try_from(index + 1).unwrap_or(i64::MAX),
            region_name: name,
            boundary_geojson: multipolygon_to_geojson(&polygon)?,
            bbox,
        });
    }

    Ok(boundaries)
}

/// Strips a leading `var x =` assignment and a trailing `;`.
fn embedded_json(text: &str) -> &str {
    let text = text.trim();
    if text.starts_with('{') {
        return text.trim_end_matches(';').trim_end();
    }

    text.split_once('=')
        .map_or(text, |(_, rhs)| rhs)
        .trim()
        .trim_end_matches(';')
        .trim_end()
}
