//! Geometry conversion helpers between `GeoJSON` text and `geo` types.

use geo::{BoundingRect, MultiPolygon};
use geojson::GeoJson;
use siting_map_energy_models::BoundingBox;

/// Parse a `GeoJSON` string into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        geometry_to_multipolygon(geom)
    } else {
        None
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`], promoting a
/// single `Polygon`. Other geometry types yield `None`.
#[must_use]
pub fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Serializes a [`MultiPolygon`] as `GeoJSON` geometry text.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Result<String, serde_json::Error> {
    let geometry = geojson::Geometry::new(geojson::Value::from(mp));
    serde_json::to_string(&geometry)
}

/// Compute the bounding box for a [`MultiPolygon`], or `None` if it is
/// empty.
#[must_use]
pub fn bounding_box(mp: &MultiPolygon<f64>) -> Option<BoundingBox> {
    mp.bounding_rect()
        .map(|rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
}
