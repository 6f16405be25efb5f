//! HTTP handler functions for the siting map API.
//!
//! `DuckDB` queries and raster reads block, so every handler that touches
//! them runs the work on the blocking thread pool via [`web::block`].

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, http::StatusCode, web};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use siting_map_database::meta;
use siting_map_raster::{LayerStatus, SampleError};
use siting_map_region::{RegionError, RegionQuery};
use siting_map_server_models::{
    ApiError, ApiHealth, ApiRegionMetrics, MAJOR_TOWNS, PixelQuery, StateMetricsQuery,
};

use crate::AppState;

/// `GET /api/health`
///
/// Reports store reachability, per-layer raster status, and the last sync
/// time. Always answers 200 so operators can read the details.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let rasters = state
        .sampler
        .catalog()
        .status()
        .into_iter()
        .map(|(layer, status)| {
            let label = match status {
                LayerStatus::Available => "ok".to_string(),
                LayerStatus::Missing => "missing".to_string(),
                LayerStatus::Unreadable(e) => format!("error: {e}"),
            };
            (layer, label)
        })
        .collect();

    let pool = state.db_pool.clone();
    let probe = web::block(move || -> Result<_, siting_map_database::DbError> {
        let conn = pool.acquire()?;
        conn.execute_batch("SELECT 1")?;
        meta::last_sync_at(&conn)
    })
    .await;

    let (database, last_sync_at) = match probe {
        Ok(Ok(last_sync_at)) => ("ok".to_string(), last_sync_at),
        Ok(Err(e)) => {
            log::error!("Health check database probe failed: {e}");
            (format!("error: {e}"), None)
        }
        Err(e) => (format!("error: {e}"), None),
    };

    HttpResponse::Ok().json(ApiHealth {
        api: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        rasters,
        last_sync_at,
    })
}

/// `GET /api/report/pixel?lon=&lat=`
///
/// Samples every raster layer at the point.
pub async fn pixel(state: web::Data<AppState>, params: web::Query<PixelQuery>) -> HttpResponse {
    let (Some(lon), Some(lat)) = (params.lon, params.lat) else {
        return error(StatusCode::BAD_REQUEST, "Both lon and lat are required");
    };

    let sampler = state.sampler.clone();
    match web::block(move || sampler.sample_point(lon, lat)).await {
        Ok(Ok(report)) => HttpResponse::Ok().json(report),
        Ok(Err(e)) => sample_error(&e),
        Err(e) => {
            log::error!("Pixel sampling task failed: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Pixel sampling failed")
        }
    }
}

/// `GET /state_metrics?state=` or `GET /state_metrics?lat=&lon=`
///
/// Returns a region's statistics and derived LCOE.
pub async fn state_metrics(
    state: web::Data<AppState>,
    params: web::Query<StateMetricsQuery>,
) -> HttpResponse {
    let query = match RegionQuery::from_params(params.state.as_deref(), params.lat, params.lon) {
        Ok(query) => query,
        Err(e) => return region_error(&e),
    };

    let result = web::block(move || {
        let conn = state.db_pool.acquire()?;
        siting_map_region::resolve(&conn, &query, &state.aliases)
    })
    .await;

    match result {
        Ok(Ok(metrics)) => HttpResponse::Ok().json(ApiRegionMetrics::from(metrics)),
        Ok(Err(e)) => region_error(&e),
        Err(e) => {
            log::error!("Region lookup task failed: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Region lookup failed")
        }
    }
}

/// `GET /states`
///
/// Returns every boundary with its statistics as a `FeatureCollection`.
pub async fn states(state: web::Data<AppState>) -> HttpResponse {
    let result = web::block(move || {
        let conn = state.db_pool.acquire()?;
        siting_map_region::states_feature_collection(&conn)
    })
    .await;

    match result {
        Ok(Ok(collection)) => HttpResponse::Ok().json(collection),
        Ok(Err(e)) => {
            log::error!("Failed to build states collection: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to query states")
        }
        Err(e) => {
            log::error!("States task failed: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to query states")
        }
    }
}

/// `GET /api/towns`
///
/// Returns the hub towns as a `FeatureCollection` of points.
pub async fn towns() -> HttpResponse {
    HttpResponse::Ok().json(towns_collection())
}

fn towns_collection() -> FeatureCollection {
    let features = MAJOR_TOWNS
        .iter()
        .map(|town| {
            let mut properties = JsonObject::new();
            properties.insert("name".to_string(), JsonValue::from(town.name));
            properties.insert("type".to_string(), JsonValue::from(town.kind));
            properties.insert("pop".to_string(), JsonValue::from(town.population));
            properties.insert("infra".to_string(), JsonValue::from(town.infrastructure));
            properties.insert("source".to_string(), JsonValue::from(town.source));
            properties.insert("source_url".to_string(), JsonValue::from(town.source_url));

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![town.lon, town.lat]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Turns a query string that fails to deserialize into a JSON 400.
pub fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error(StatusCode::BAD_REQUEST, err.to_string());
    InternalError::from_response(err, response).into()
}

fn error(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ApiError::new(message))
}

fn sample_error(e: &SampleError) -> HttpResponse {
    match e {
        SampleError::Validation(_) => error(StatusCode::BAD_REQUEST, e.to_string()),
        SampleError::NoCoverage { .. } => error(StatusCode::NOT_FOUND, e.to_string()),
        SampleError::AllLayersFailed { .. } => {
            log::error!("{e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Pixel sampling failed")
        }
    }
}

fn region_error(e: &RegionError) -> HttpResponse {
    match e {
        RegionError::InvalidQuery(_) | RegionError::Coordinate(_) => {
            error(StatusCode::BAD_REQUEST, e.to_string())
        }
        RegionError::NotFound(_) => error(StatusCode::NOT_FOUND, e.to_string()),
        RegionError::Database(_) => {
            log::error!("Region lookup failed: {e}");
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal database error")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};
    use siting_map_database::{DuckDbPool, TableSet, boundaries, schema, statistics};
    use siting_map_energy_models::{BoundingBox, LayerName};
    use siting_map_raster::{Crs, GeoTransform, PointSampler, RasterCatalog, RasterError, RasterMetadata, RasterSource};
    use siting_map_region_models::{
        AdministrativeBoundary, NameReconciliationMap, RegionStatistic, StatisticValues,
    };

    use super::*;

    /// Uniform WGS84 layer over the territory.
    struct ConstantLayer {
        metadata: RasterMetadata,
        value: f64,
    }

    impl ConstantLayer {
        fn boxed(value: f64) -> Box<dyn RasterSource> {
            Box::new(Self {
                metadata: RasterMetadata {
                    crs: Crs::WGS84,
                    nodata: Some(-9999.0),
                    transform: GeoTransform::north_up(40.5, 12.0, 0.5, 0.5),
                    width: 22,
                    height: 28,
                },
                value,
            })
        }
    }

    impl RasterSource for ConstantLayer {
        fn metadata(&self) -> &RasterMetadata {
            &self.metadata
        }

        fn read_pixel(&mut self, _col: u32, _row: u32) -> Result<f64, RasterError> {
            Ok(self.value)
        }
    }

    fn square(id: i64, name: &str, west: f64, south: f64, east: f64, north: f64) -> AdministrativeBoundary {
        AdministrativeBoundary {
            id,
            region_name: name.to_string(),
            boundary_geojson: format!(
                r#"{{"type":"MultiPolygon","coordinates":[[[[{west},{south}],[{east},{south}],[{east},{north}],[{west},{north}],[{west},{south}]]]]}}"#
            ),
            bbox: BoundingBox::new(west, south, east, north),
        }
    }

    fn state(layers: Vec<(LayerName, Box<dyn RasterSource>)>) -> web::Data<AppState> {
        let conn = schema::open_in_memory().unwrap();
        boundaries::insert_all(
            &conn,
            TableSet::Live,
            &[
                square(1, "Banadir Regional Admin", 45.1, 1.9, 45.6, 2.2),
                square(2, "Jubaland", 41.0, -1.5, 43.0, 1.0),
            ],
        )
        .unwrap();
        statistics::insert_all(
            &conn,
            TableSet::Live,
            &[RegionStatistic {
                id: 1,
                region_name: "Banadir Regional Admin".to_string(),
                values: StatisticValues {
                    solar_mean_score: Some(7.0),
                    wind_mean_score: Some(5.0),
                    ..StatisticValues::default()
                },
            }],
        )
        .unwrap();
        let second = conn.try_clone().unwrap();

        web::Data::new(AppState {
            sampler: Arc::new(PointSampler::new(Arc::new(RasterCatalog::from_sources(layers)))),
            aliases: NameReconciliationMap::default(),
            db_pool: Arc::new(DuckDbPool::from_connections(vec![conn, second])),
        })
    }

    async fn get(state: web::Data<AppState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = test::init_service(App::new().app_data(state).configure(crate::configure_api)).await;
        let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = response.status();
        let body: serde_json::Value = test::read_body_json(response).await;
        (status, body)
    }

    #[actix_web::test]
    async fn pixel_reports_every_layer() {
        let state = state(vec![(LayerName::SolarMeanScore, ConstantLayer::boxed(8.0))]);
        let (status, body) = get(state, "/api/report/pixel?lon=45.3182&lat=2.0469").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["solar_mean_score"], 8.0);
        assert!(body["wind_mean_score"].is_null());
        assert!(body["slope"].is_null());
        assert_eq!(body["lcoe_solar"], 0.11);
    }

    #[actix_web::test]
    async fn pixel_outside_territory_is_bad_request() {
        let state = state(vec![(LayerName::SolarMeanScore, ConstantLayer::boxed(8.0))]);
        let (status, body) = get(state, "/api/report/pixel?lon=30&lat=2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[actix_web::test]
    async fn pixel_without_coverage_is_not_found() {
        let state = state(vec![(LayerName::SolarMeanScore, ConstantLayer::boxed(-9999.0))]);
        let (status, _) = get(state, "/api/report/pixel?lon=45&lat=2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn pixel_requires_both_coordinates() {
        let state = state(vec![]);
        let (status, _) = get(state, "/api/report/pixel?lon=45").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_query_values_are_json_bad_requests() {
        for uri in [
            "/api/report/pixel?lon=abc&lat=2",
            "/state_metrics?lat=north&lon=45",
        ] {
            let (status, body) = get(state(vec![]), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].as_str().unwrap().contains("invalid float literal"), "{uri}");
        }
    }

    #[actix_web::test]
    async fn point_outside_every_region_still_samples() {
        let uri = "lon=50&lat=8";
        let layers = || vec![(LayerName::WindMeanScore, ConstantLayer::boxed(6.0))];

        let (status, body) = get(state(layers()), &format!("/state_metrics?{uri}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, body) = get(state(layers()), &format!("/api/report/pixel?{uri}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["wind_mean_score"], 6.0);
    }

    #[actix_web::test]
    async fn blank_state_uses_coordinates() {
        let (status, body) = get(state(vec![]), "/state_metrics?state=&lat=2.0469&lon=45.3182").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state_name"], "Banadir Regional Admin");
    }

    #[actix_web::test]
    async fn state_metrics_by_name_and_point_agree() {
        let (status, by_name) = get(state(vec![]), "/state_metrics?state=Banadir").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_name["state_name"], "Banadir Regional Admin");
        assert_eq!(by_name["lcoe_wind"], 0.1);

        let (status, by_point) = get(state(vec![]), "/state_metrics?lat=2.0469&lon=45.3182").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_point, by_name);
    }

    #[actix_web::test]
    async fn state_metrics_status_codes() {
        let cases = [
            ("/state_metrics", StatusCode::BAD_REQUEST),
            ("/state_metrics?state=Banadir&lat=2&lon=45", StatusCode::BAD_REQUEST),
            ("/state_metrics?lat=2&lon=60", StatusCode::BAD_REQUEST),
            ("/state_metrics?state=Atlantis", StatusCode::NOT_FOUND),
            ("/state_metrics?lat=8&lon=50", StatusCode::NOT_FOUND),
        ];

        for (uri, expected) in cases {
            let (status, body) = get(state(vec![]), uri).await;
            assert_eq!(status, expected, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[actix_web::test]
    async fn boundary_without_statistics_has_null_metrics() {
        let (status, body) = get(state(vec![]), "/state_metrics?state=Jubaland").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].is_null());
        assert!(body["solar_mean_score"].is_null());
        assert!(body["lcoe_solar"].is_null());
    }

    #[actix_web::test]
    async fn states_lists_boundaries() {
        let (status, body) = get(state(vec![]), "/states").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "FeatureCollection");
        assert_eq!(body["features"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn health_reports_layers_and_database() {
        let state = state(vec![(LayerName::MeanGhi, ConstantLayer::boxed(5.5))]);
        let (status, body) = get(state, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");
        assert_eq!(body["rasters"]["mean_ghi"], "ok");
        assert_eq!(body["rasters"]["slope"], "missing");
        assert!(body["last_sync_at"].is_null());
    }

    #[actix_web::test]
    async fn towns_are_points() {
        let (status, body) = get(state(vec![]), "/api/towns").await;
        assert_eq!(status, StatusCode::OK);

        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 6);
        assert_eq!(features[0]["properties"]["name"], "Mogadishu");
        assert_eq!(features[0]["geometry"]["type"], "Point");
    }
}
