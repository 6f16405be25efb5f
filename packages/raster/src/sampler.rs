//! Multi-layer point sampling.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use siting_map_energy_models::{CoordinateError, LayerName, Lcoe, validate_coordinate};

use crate::catalog::RasterCatalog;
use crate::reproject::ReprojectionCache;

/// Why a point could not be sampled.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// The coordinate failed validation.
    #[error(transparent)]
    Validation(#[from] CoordinateError),

    /// Every layer resolved to no value.
    #[error("No raster coverage at ({lon}, {lat})")]
    NoCoverage {
        /// Requested longitude.
        lon: f64,
        /// Requested latitude.
        lat: f64,
    },

    /// Every open layer failed to read.
    #[error("All {attempted} raster layers failed to read at ({lon}, {lat})")]
    AllLayersFailed {
        /// Number of layers attempted.
        attempted: usize,
        /// Requested longitude.
        lon: f64,
        /// Requested latitude.
        lat: f64,
    },
}

/// Sampled layer values at one point, plus derived LCOE.
///
/// Serializes as a flat JSON object keyed by layer name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelReport {
    /// Value of every configured layer; `None` when missing.
    #[serde(flatten)]
    pub values: BTreeMap<LayerName, Option<f64>>,
    /// LCOE derived from the solar and wind scores.
    #[serde(flatten)]
    pub lcoe: Lcoe,
}

impl PixelReport {
    /// Value of one layer, if present.
    #[must_use]
    pub fn value(&self, layer: LayerName) -> Option<f64> {
        self.values.get(&layer).copied().flatten()
    }
}

/// Resolves a raw pixel value: nodata, `NaN`, and infinities are missing.
#[must_use]
pub fn resolve_value(raw: Option<f64>, nodata: Option<f64>) -> Option<f64> {
    raw.filter(|value| value.is_finite())
        .filter(|&value| !nodata.is_some_and(|nodata| crate::is_nodata(value, nodata)))
}

/// Answers "what are all layer values at `(lon, lat)`?".
#[derive(Debug)]
pub struct PointSampler {
    catalog: Arc<RasterCatalog>,
    reprojection: ReprojectionCache,
}

impl PointSampler {
    /// Creates a sampler over `catalog` with an empty reprojection cache.
    #[must_use]
    pub fn new(catalog: Arc<RasterCatalog>) -> Self {
        Self {
            catalog,
            reprojection: ReprojectionCache::new(),
        }
    }

    /// The catalog this sampler reads from.
    #[must_use]
    pub fn catalog(&self) -> &RasterCatalog {
        &self.catalog
    }

    /// The reprojection cache shared by all calls.
    #[must_use]
    pub const fn reprojection(&self) -> &ReprojectionCache {
        &self.reprojection
    }

    /// Samples every configured layer at `(lon, lat)`.
    ///
    /// A layer that fails to read is logged and reported as missing.
    ///
    /// # Errors
    ///
    /// * [`SampleError::Validation`] if the point is outside the territory
    /// * [`SampleError::AllLayersFailed`] if every open layer failed to read
    /// * [`SampleError::NoCoverage`] if every layer is missing at the point
    pub fn sample_point(&self, lon: f64, lat: f64) -> Result<PixelReport, SampleError> {
        validate_coordinate(lon, lat)?;

        let mut values = BTreeMap::new();
        let mut attempted = 0_usize;
        let mut failed = 0_usize;

        for &layer in LayerName::ALL {
            let Some(metadata) = self.catalog.metadata(layer) else {
                values.insert(layer, None);
                continue;
            };
            attempted += 1;

            let (x, y) = self.reprojection.transform(lon, lat, &metadata.crs);

            let value = match self.catalog.sample(layer, x, y) {
                Ok(raw) => resolve_value(raw, metadata.nodata),
                Err(e) => {
                    log::warn!("Failed to sample {layer} at ({lon}, {lat}): {e}");
                    failed += 1;
                    None
                }
            };

            values.insert(layer, value);
        }

        if attempted > 0 && failed == attempted {
            log::error!("Every raster layer failed to read at ({lon}, {lat})");
            return Err(SampleError::AllLayersFailed {
                attempted,
                lon,
                lat,
            });
        }

        if values.values().all(Option::is_none) {
            return Err(SampleError::NoCoverage { lon, lat });
        }

        let lcoe = Lcoe::from_scores(
            values.get(&LayerName::SolarMeanScore).copied().flatten(),
            values.get(&LayerName::WindMeanScore).copied().flatten(),
        );

        Ok(PixelReport { values, lcoe })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::geotiff::fixtures::write_geotiff;
    use crate::source::testing::GridSource;
    use crate::source::{GeoTransform, RasterSource};

    const MOGADISHU: (f64, f64) = (45.3182, 2.0469);

    fn boxed(source: GridSource) -> Box<dyn RasterSource> {
        Box::new(source)
    }

    fn sampler(sources: Vec<(LayerName, Box<dyn RasterSource>)>) -> PointSampler {
        PointSampler::new(Arc::new(RasterCatalog::from_sources(sources)))
    }

    #[test]
    fn rejects_points_outside_territory() {
        let sampler = sampler(vec![(LayerName::Slope, boxed(GridSource::territory(1.0, None)))]);

        for (lon, lat) in [(40.5, 5.0), (52.0, 5.0), (45.0, -3.0), (45.0, 12.0), (f64::NAN, 5.0)] {
            assert!(matches!(
                sampler.sample_point(lon, lat),
                Err(SampleError::Validation(_))
            ));
        }
    }

    #[test]
    fn reports_every_layer_and_derives_lcoe() {
        let sampler = sampler(vec![
            (LayerName::SolarMeanScore, boxed(GridSource::territory(10.0, None))),
            (LayerName::WindMeanScore, boxed(GridSource::territory(2.5, None))),
            (LayerName::Slope, boxed(GridSource::territory(3.25, None))),
        ]);

        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();

        assert_eq!(report.values.len(), LayerName::ALL.len());
        assert_eq!(report.value(LayerName::SolarMeanScore), Some(10.0));
        assert_eq!(report.value(LayerName::Slope), Some(3.25));
        assert_eq!(report.value(LayerName::MeanGhi), None);
        assert_eq!(report.lcoe.lcoe_solar, Some(0.1));
        assert_eq!(report.lcoe.lcoe_wind, Some(0.11));
    }

    #[test]
    fn missing_solar_score_means_missing_solar_lcoe() {
        let sampler = sampler(vec![
            (LayerName::SolarMeanScore, boxed(GridSource::territory(-9999.0, Some(-9999.0)))),
            (LayerName::WindMeanScore, boxed(GridSource::territory(5.0, None))),
        ]);

        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();
        assert_eq!(report.value(LayerName::SolarMeanScore), None);
        assert_eq!(report.lcoe.lcoe_solar, None);
        assert_eq!(report.lcoe.lcoe_wind, Some(0.1));
    }

    #[test]
    fn zero_score_is_a_value() {
        let sampler = sampler(vec![(LayerName::SolarMeanScore, boxed(GridSource::territory(0.0, None)))]);

        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();
        assert_eq!(report.value(LayerName::SolarMeanScore), Some(0.0));
        assert_eq!(report.lcoe.lcoe_solar, Some(0.15));
    }

    #[test]
    fn all_missing_is_no_coverage() {
        let sampler = sampler(vec![
            (LayerName::Slope, boxed(GridSource::territory(f64::NAN, None))),
            (LayerName::MeanGhi, boxed(GridSource::territory(0.0, Some(0.0)))),
        ]);

        assert!(matches!(
            sampler.sample_point(MOGADISHU.0, MOGADISHU.1),
            Err(SampleError::NoCoverage { .. })
        ));
    }

    #[test]
    fn empty_catalog_is_no_coverage() {
        let sampler = sampler(vec![]);
        assert!(matches!(
            sampler.sample_point(MOGADISHU.0, MOGADISHU.1),
            Err(SampleError::NoCoverage { .. })
        ));
    }

    #[test]
    fn single_layer_failure_degrades_to_missing() {
        let mut broken = GridSource::territory(1.0, None);
        broken.fail_reads = true;
        let sampler = sampler(vec![
            (LayerName::Slope, boxed(broken)),
            (LayerName::MeanGhi, boxed(GridSource::territory(5.5, None))),
        ]);

        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();
        assert_eq!(report.value(LayerName::Slope), None);
        assert_eq!(report.value(LayerName::MeanGhi), Some(5.5));
    }

    #[test]
    fn every_layer_failing_is_an_upstream_failure() {
        let mut broken = GridSource::territory(1.0, None);
        broken.fail_reads = true;
        let sampler = sampler(vec![(LayerName::Slope, boxed(broken))]);

        assert!(matches!(
            sampler.sample_point(MOGADISHU.0, MOGADISHU.1),
            Err(SampleError::AllLayersFailed { attempted: 1, .. })
        ));
    }

    #[test]
    fn values_are_finite_or_missing() {
        let mut grid = GridSource::territory(1.0, None);
        grid.set(9, 19, f64::INFINITY);
        let sampler = sampler(vec![
            (LayerName::Slope, boxed(grid)),
            (LayerName::MeanWpd, boxed(GridSource::territory(120.0, None))),
        ]);

        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();
        assert!(report.values.values().flatten().all(|v| v.is_finite()));
        assert_eq!(report.value(LayerName::Slope), None);
    }

    #[test]
    fn nodata_within_epsilon_is_missing() {
        assert_eq!(resolve_value(Some(-9999.0 + 1e-12), Some(-9999.0)), None);
        assert_eq!(resolve_value(Some(-9998.0), Some(-9999.0)), Some(-9998.0));
        assert_eq!(resolve_value(Some(0.5), None), Some(0.5));
        assert_eq!(resolve_value(None, None), None);
    }

    #[test]
    fn samples_projected_layers_through_reprojection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solar.tif");
        let mut data = vec![1.0_f32; 30 * 30];
        // Mogadishu lands at (535_400, 226_300) in UTM 38N: column 13, row 17.
        data[17 * 30 + 13] = 8.0;
        write_geotiff(&path, 30, 30, (400_000.0, 400_000.0), 10_000.0, Some(32638), None, &data);

        let source = crate::geotiff::GeoTiffSource::open(&path).unwrap();
        assert_eq!(source.metadata().crs, Crs::Epsg(32638));
        let sampler = sampler(vec![(LayerName::SolarMeanScore, Box::new(source) as Box<dyn RasterSource>)]);

        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();
        assert_eq!(report.value(LayerName::SolarMeanScore), Some(8.0));
        assert_eq!(report.lcoe.lcoe_solar, Some(0.11));

        let _ = sampler.sample_point(MOGADISHU.0 + 0.01, MOGADISHU.1).unwrap();
        assert_eq!(sampler.reprojection().builds(), 1);
    }

    #[test]
    fn serializes_as_flat_object() {
        let grid = GridSource::filled(
            Crs::WGS84,
            GeoTransform::north_up(40.5, 12.0, 0.5, 0.5),
            22,
            28,
            4.0,
            None,
        );
        let sampler = sampler(vec![(LayerName::SolarMeanScore, boxed(grid))]);
        let report = sampler.sample_point(MOGADISHU.0, MOGADISHU.1).unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["solar_mean_score"], 4.0);
        assert_eq!(json["lcoe_solar"], 0.13);
        assert!(json["slope"].is_null());
        assert!(json["lcoe_wind"].is_null());
    }
}
