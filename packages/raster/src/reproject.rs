//! WGS84-to-layer coordinate transformation.
//!
//! Transformers are built lazily, once per distinct target CRS, and shared
//! by every subsequent request. Building is the only expensive part; a
//! transform of a single point is a handful of floating point operations.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::RasterError;
use crate::crs::Crs;

/// Transforms WGS84 longitude/latitude into one target CRS.
pub struct CoordTransformer {
    source_proj: Proj,
    target_proj: Proj,
    target: Crs,
    target_is_geographic: bool,
}

impl std::fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("target", &self.target)
            .field("target_is_geographic", &self.target_is_geographic)
            .finish_non_exhaustive()
    }
}

impl CoordTransformer {
    /// Builds a transformer from WGS84 to `target`.
    ///
    /// # Errors
    ///
    /// * If `target` has no known `proj4` definition
    /// * If either projection fails to initialize
    pub fn from_wgs84(target: &Crs) -> Result<Self, RasterError> {
        let source_str = Crs::WGS84
            .proj_string()
            .ok_or_else(|| RasterError::UnsupportedCrs(Crs::WGS84.identifier()))?;
        let target_str = target
            .proj_string()
            .ok_or_else(|| RasterError::UnsupportedCrs(target.identifier()))?;

        let source_proj = Proj::from_proj_string(&source_str)
            .map_err(|e| RasterError::Projection(format!("Invalid source projection: {e:?}")))?;
        let target_proj = Proj::from_proj_string(&target_str).map_err(|e| {
            RasterError::Projection(format!("Invalid target projection {target}: {e:?}"))
        })?;

        Ok(Self {
            source_proj,
            target_proj,
            target: target.clone(),
            target_is_geographic: target.is_geographic(),
        })
    }

    /// Transforms `(lon, lat)` in degrees into target CRS coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::Projection`] if the transformation fails.
    pub fn transform(&self, lon: f64, lat: f64) -> Result<(f64, f64), RasterError> {
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);

        transform(&self.source_proj, &self.target_proj, &mut point)
            .map_err(|e| RasterError::Projection(format!("Transform to {} failed: {e:?}", self.target)))?;

        if self.target_is_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }
}

/// Shared cache of [`CoordTransformer`]s keyed by target CRS identity.
#[derive(Debug, Default)]
pub struct ReprojectionCache {
    transformers: Mutex<BTreeMap<String, Arc<CoordTransformer>>>,
    builds: AtomicUsize,
}

impl ReprojectionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached transformer for `target`, building it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the transformer cannot be built. Failures
    /// are not cached.
    pub fn transformer(&self, target: &Crs) -> Result<Arc<CoordTransformer>, RasterError> {
        let key = target.identifier();
        let mut transformers = self
            .transformers
            .lock()
            .map_err(|_| RasterError::LockPoisoned("reprojection cache".to_string()))?;

        if let Some(existing) = transformers.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let built = Arc::new(CoordTransformer::from_wgs84(target)?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        log::debug!("Built WGS84 -> {key} transformer");
        transformers.insert(key, Arc::clone(&built));

        Ok(built)
    }

    /// Maps WGS84 `(lon, lat)` into `target` coordinates.
    ///
    /// Geographic targets are treated as WGS84 and returned unchanged. If
    /// the transformer cannot be built or the transform fails, the input
    /// is returned unchanged and a warning is logged.
    #[must_use]
    pub fn transform(&self, lon: f64, lat: f64, target: &Crs) -> (f64, f64) {
        if target.is_geographic() {
            return (lon, lat);
        }

        match self
            .transformer(target)
            .and_then(|transformer| transformer.transform(lon, lat))
        {
            Ok(projected) => projected,
            Err(e) => {
                log::warn!("Reprojection of ({lon}, {lat}) to {target} failed, using input coordinates: {e}");
                (lon, lat)
            }
        }
    }

    /// Number of cached transformers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.lock().map_or(0, |t| t.len())
    }

    /// Returns `true` if no transformer has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of transformers built over the cache's lifetime.
    #[must_use]
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOGADISHU: (f64, f64) = (45.3182, 2.0469);

    #[test]
    fn projects_into_utm_zone_38n() {
        let transformer = CoordTransformer::from_wgs84(&Crs::Epsg(32638)).unwrap();
        let (x, y) = transformer.transform(MOGADISHU.0, MOGADISHU.1).unwrap();
        assert!((x - 535_400.0).abs() < 500.0, "x = {x}");
        assert!((y - 226_300.0).abs() < 500.0, "y = {y}");
    }

    #[test]
    fn projects_central_meridian_to_false_easting() {
        let transformer = CoordTransformer::from_wgs84(&Crs::Epsg(32638)).unwrap();
        let (x, y) = transformer.transform(45.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-3);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn geographic_targets_are_identity() {
        let cache = ReprojectionCache::new();
        assert_eq!(cache.transform(45.0, 2.0, &Crs::WGS84), (45.0, 2.0));
        assert!(cache.is_empty());
    }

    #[test]
    fn builds_each_target_once() {
        let cache = ReprojectionCache::new();
        let target = Crs::Epsg(32638);

        let first = cache.transform(MOGADISHU.0, MOGADISHU.1, &target);
        let second = cache.transform(MOGADISHU.0, MOGADISHU.1, &target);
        let _ = cache.transform(45.0, 5.0, &Crs::Epsg(32639));

        assert_eq!(first, second);
        let direct = CoordTransformer::from_wgs84(&target)
            .unwrap()
            .transform(MOGADISHU.0, MOGADISHU.1)
            .unwrap();
        assert!((first.0 - direct.0).abs() < 1e-6);
        assert!((first.1 - direct.1).abs() < 1e-6);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.builds(), 2);
    }

    #[test]
    fn unsupported_target_falls_back_to_input() {
        let cache = ReprojectionCache::new();
        assert_eq!(cache.transform(45.0, 2.0, &Crs::Epsg(20538)), (45.0, 2.0));
        assert!(cache.is_empty());
        assert_eq!(cache.builds(), 0);
    }

    #[test]
    fn shared_across_threads() {
        let cache = Arc::new(ReprojectionCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.transform(MOGADISHU.0, MOGADISHU.1, &Crs::Epsg(32638)))
            })
            .collect();

        for handle in handles {
            let (x, _) = handle.join().unwrap();
            assert!(x > 500_000.0);
        }
        assert_eq!(cache.builds(), 1);
    }
}
