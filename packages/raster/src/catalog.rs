//! The set of raster layers opened at startup.
//!
//! Each layer owns one open source behind its own mutex, so concurrent
//! requests sampling different layers never contend and requests sampling
//! the same layer serialize only around the pixel read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use siting_map_energy_models::LayerName;

use crate::RasterError;
use crate::geotiff::GeoTiffSource;
use crate::source::{RasterMetadata, RasterSource};

/// Availability of one configured layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    /// The layer opened and is being served.
    Available,
    /// The layer's file does not exist.
    Missing,
    /// The file exists but could not be opened.
    Unreadable(String),
}

struct LayerHandle {
    metadata: RasterMetadata,
    source: Mutex<Box<dyn RasterSource>>,
}

/// The opened raster layers, keyed by [`LayerName`].
pub struct RasterCatalog {
    layers: BTreeMap<LayerName, LayerHandle>,
    unavailable: BTreeMap<LayerName, LayerStatus>,
}

impl std::fmt::Debug for RasterCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterCatalog")
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .field("unavailable", &self.unavailable)
            .finish()
    }
}

impl RasterCatalog {
    /// Opens every configured layer found in `dir`.
    ///
    /// Never fails: a missing or unreadable layer is logged and left out,
    /// and every later sample of it reports no value.
    #[must_use]
    pub fn open(dir: &Path) -> Self {
        let mut layers = BTreeMap::new();
        let mut unavailable = BTreeMap::new();

        for &name in LayerName::ALL {
            let path = layer_path(dir, name);

            if !path.is_file() {
                log::warn!("Raster layer {name} not found at {}", path.display());
                unavailable.insert(name, LayerStatus::Missing);
                continue;
            }

            match GeoTiffSource::open(&path) {
                Ok(source) => {
                    log::info!(
                        "Opened raster layer {name} ({}x{}, {})",
                        source.metadata().width,
                        source.metadata().height,
                        source.metadata().crs,
                    );
                    layers.insert(name, LayerHandle::new(Box::new(source)));
                }
                Err(e) => {
                    log::error!("Failed to open raster layer {name} at {}: {e}", path.display());
                    unavailable.insert(name, LayerStatus::Unreadable(e.to_string()));
                }
            }
        }

        log::info!(
            "Raster catalog ready: {}/{} layers available",
            layers.len(),
            LayerName::ALL.len()
        );

        Self {
            layers,
            unavailable,
        }
    }

    /// Builds a catalog from already-open sources. Configured layers not
    /// provided are reported as missing.
    #[must_use]
    pub fn from_sources(sources: impl IntoIterator<Item = (LayerName, Box<dyn RasterSource>)>) -> Self {
        let layers: BTreeMap<_, _> = sources
            .into_iter()
            .map(|(name, source)| (name, LayerHandle::new(source)))
            .collect();
        let unavailable = LayerName::ALL
            .iter()
            .filter(|name| !layers.contains_key(name))
            .map(|&name| (name, LayerStatus::Missing))
            .collect();

        Self {
            layers,
            unavailable,
        }
    }

    /// Names of the layers that opened successfully.
    pub fn available(&self) -> impl Iterator<Item = LayerName> + '_ {
        self.layers.keys().copied()
    }

    /// Number of layers that opened successfully.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no layer opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Status of every configured layer.
    #[must_use]
    pub fn status(&self) -> BTreeMap<LayerName, LayerStatus> {
        LayerName::ALL
            .iter()
            .map(|&name| {
                let status = if self.layers.contains_key(&name) {
                    LayerStatus::Available
                } else {
                    self.unavailable
                        .get(&name)
                        .cloned()
                        .unwrap_or(LayerStatus::Missing)
                };
                (name, status)
            })
            .collect()
    }

    /// Georeferencing of an open layer.
    #[must_use]
    pub fn metadata(&self, name: LayerName) -> Option<&RasterMetadata> {
        self.layers.get(&name).map(|handle| &handle.metadata)
    }

    /// Reads the raw band-1 value of `name` at `(x, y)` in the layer's own
    /// CRS.
    ///
    /// Returns `Ok(None)` if the coordinate falls outside the raster.
    ///
    /// # Errors
    ///
    /// * [`RasterError::LayerUnavailable`] if the layer did not open
    /// * Any error from decoding the pixel
    pub fn sample(&self, name: LayerName, x: f64, y: f64) -> Result<Option<f64>, RasterError> {
        let handle = self
            .layers
            .get(&name)
            .ok_or(RasterError::LayerUnavailable(name))?;

        let Some((col, row)) = handle.metadata.cell_at(x, y) else {
            return Ok(None);
        };

        let mut source = handle
            .source
            .lock()
            .map_err(|_| RasterError::LockPoisoned(name.to_string()))?;

        source.read_pixel(col, row).map(Some)
    }
}

impl LayerHandle {
    fn new(source: Box<dyn RasterSource>) -> Self {
        Self {
            metadata: source.metadata().clone(),
            source: Mutex::new(source),
        }
    }
}

/// Path of `name`'s `GeoTIFF` inside `dir`.
#[must_use]
pub fn layer_path(dir: &Path, name: LayerName) -> PathBuf {
    dir.join(name.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotiff::fixtures::write_geotiff;
    use crate::source::testing::GridSource;

    #[test]
    fn missing_directory_yields_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = RasterCatalog::open(&dir.path().join("nope"));

        assert!(catalog.is_empty());
        assert!(
            catalog
                .status()
                .values()
                .all(|status| *status == LayerStatus::Missing)
        );
    }

    #[test]
    fn opens_present_layers_and_skips_broken_ones() {
        let dir = tempfile::tempdir().unwrap();
        write_geotiff(
            &layer_path(dir.path(), LayerName::Slope),
            2,
            2,
            (45.0, 3.0),
            0.5,
            Some(4326),
            None,
            &[1.0, 2.0, 3.0, 4.0],
        );
        std::fs::write(layer_path(dir.path(), LayerName::MeanGhi), b"garbage").unwrap();

        let catalog = RasterCatalog::open(dir.path());
        let status = catalog.status();

        assert_eq!(catalog.len(), 1);
        assert_eq!(status[&LayerName::Slope], LayerStatus::Available);
        assert!(matches!(status[&LayerName::MeanGhi], LayerStatus::Unreadable(_)));
        assert_eq!(status[&LayerName::MeanWpd], LayerStatus::Missing);
        assert_eq!(catalog.sample(LayerName::Slope, 45.6, 2.9).unwrap(), Some(2.0));
    }

    #[test]
    fn samples_nearest_cell() {
        let mut grid = GridSource::territory(1.0, None);
        grid.set(9, 19, 7.5);
        let catalog = RasterCatalog::from_sources([(
            LayerName::SolarMeanScore,
            Box::new(grid) as Box<dyn RasterSource>,
        )]);

        assert_eq!(
            catalog.sample(LayerName::SolarMeanScore, 45.3182, 2.0469).unwrap(),
            Some(7.5)
        );
    }

    #[test]
    fn outside_extent_is_no_value() {
        let catalog = RasterCatalog::from_sources([(
            LayerName::Slope,
            Box::new(GridSource::territory(1.0, None)) as Box<dyn RasterSource>,
        )]);

        assert_eq!(catalog.sample(LayerName::Slope, 30.0, 2.0).unwrap(), None);
    }

    #[test]
    fn unavailable_layer_is_an_error() {
        let catalog = RasterCatalog::from_sources(std::iter::empty());
        assert!(matches!(
            catalog.sample(LayerName::MeanWpd, 45.0, 2.0),
            Err(RasterError::LayerUnavailable(LayerName::MeanWpd))
        ));
    }
}
