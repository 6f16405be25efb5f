//! Operator checks over the raster directory.

use std::path::{Path, PathBuf};

use siting_map_energy_models::LayerName;

use crate::RasterError;
use crate::catalog::layer_path;
use crate::geotiff::{BandStatistics, GeoTiffSource};
use crate::source::{RasterMetadata, RasterSource};

/// Result of checking one configured layer.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    /// The file opened; its georeferencing is attached.
    Valid(RasterMetadata),
    /// No file at the expected path.
    Missing,
    /// The file exists but failed to open.
    Unreadable(String),
}

/// One row of a raster audit.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerAudit {
    /// The layer checked.
    pub layer: LayerName,
    /// Where the layer was expected.
    pub path: PathBuf,
    /// What was found.
    pub outcome: AuditOutcome,
}

impl LayerAudit {
    /// Returns `true` if the layer opened.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self.outcome, AuditOutcome::Valid(_))
    }
}

/// Checks that every configured layer exists in `dir` and opens.
#[must_use]
pub fn audit(dir: &Path) -> Vec<LayerAudit> {
    LayerName::ALL
        .iter()
        .map(|&layer| {
            let path = layer_path(dir, layer);
            let outcome = if path.is_file() {
                match GeoTiffSource::open(&path) {
                    Ok(source) => AuditOutcome::Valid(source.metadata().clone()),
                    Err(e) => AuditOutcome::Unreadable(e.to_string()),
                }
            } else {
                AuditOutcome::Missing
            };

            LayerAudit {
                layer,
                path,
                outcome,
            }
        })
        .collect()
}

/// Opens a single `GeoTIFF` and summarizes its band-1 values.
///
/// # Errors
///
/// Returns [`RasterError`] if the file fails to open or decode.
pub fn inspect(path: &Path) -> Result<(RasterMetadata, BandStatistics), RasterError> {
    let mut source = GeoTiffSource::open(path)?;
    let statistics = source.band_statistics()?;
    Ok((source.metadata().clone(), statistics))
}
