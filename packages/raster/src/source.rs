//! Raster source abstraction.
//!
//! A [`RasterSource`] exposes the georeferencing of a single-band raster
//! and reads one band-1 value by pixel index. Mapping a coordinate to the
//! nearest cell is done once, in [`RasterMetadata::cell_at`], so every
//! source samples identically regardless of its on-disk layout.

use crate::RasterError;
use crate::crs::Crs;

/// Affine transform from pixel space to CRS coordinates, in GDAL order:
/// `[origin_x, pixel_width, row_rotation, origin_y, column_rotation,
/// pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform from an upper-left origin and positive pixel
    /// sizes.
    #[must_use]
    pub const fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height])
    }

    /// Builds the transform from `GeoTIFF` `ModelPixelScale` and the first
    /// `ModelTiepoint`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::MissingGeoreference`] if either tag is too
    /// short.
    pub fn from_scale_and_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Result<Self, RasterError> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(RasterError::MissingGeoreference {
                reason: format!(
                    "pixel scale has {} values and tiepoint has {}",
                    scale.len(),
                    tiepoint.len()
                ),
            });
        }

        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);

        Ok(Self::north_up(
            sx.mul_add(-i, x),
            sy.mul_add(j, y),
            sx,
            sy,
        ))
    }

    /// Builds the transform from a row-major 4x4 `ModelTransformation`
    /// matrix.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::MissingGeoreference`] if the matrix has fewer
    /// than 8 values.
    pub fn from_model_transformation(matrix: &[f64]) -> Result<Self, RasterError> {
        if matrix.len() < 8 {
            return Err(RasterError::MissingGeoreference {
                reason: format!("model transformation has {} values", matrix.len()),
            });
        }

        Ok(Self([
            matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
        ]))
    }

    /// Moves the origin from the centre of the upper-left pixel to its
    /// outer corner, turning a `PixelIsPoint` grid into the `PixelIsArea`
    /// convention used everywhere else.
    #[must_use]
    pub fn shifted_to_pixel_corner(&self) -> Self {
        let [x0, a, b, y0, d, e] = self.0;
        Self([(a + b).mul_add(-0.5, x0), a, b, (d + e).mul_add(-0.5, y0), d, e])
    }

    /// Maps pixel-space `(col, row)` to CRS coordinates.
    #[must_use]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let [x0, a, b, y0, d, e] = self.0;
        (
            b.mul_add(row, a.mul_add(col, x0)),
            e.mul_add(row, d.mul_add(col, y0)),
        )
    }

    /// Maps CRS coordinates to fractional pixel-space `(col, row)`.
    ///
    /// Returns `None` if the transform is not invertible.
    #[must_use]
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let [x0, a, b, y0, d, e] = self.0;
        let det = a.mul_add(e, -(b * d));
        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let dx = x - x0;
        let dy = y - y0;
        let col = e.mul_add(dx, -(b * dy)) / det;
        let row = a.mul_add(dy, -(d * dx)) / det;
        Some((col, row))
    }

    /// Absolute pixel size along x and y.
    #[must_use]
    pub fn resolution(&self) -> (f64, f64) {
        let [_, a, b, _, d, e] = self.0;
        (a.hypot(d), b.hypot(e))
    }
}

/// Georeferencing and band description of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMetadata {
    /// Coordinate reference system of the pixel grid.
    pub crs: Crs,
    /// Band 1 nodata sentinel, if declared.
    pub nodata: Option<f64>,
    /// Pixel-to-CRS transform.
    pub transform: GeoTransform,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RasterMetadata {
    /// Returns the `(col, row)` of the cell containing `(x, y)`, or `None`
    /// if the coordinate falls outside the raster.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let (col, row) = self.transform.invert(x, y)?;
        let (col, row) = (col.floor(), row.floor());

        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        if col < 0.0 || row < 0.0 || col >= f64::from(self.width) || row >= f64::from(self.height)
        {
            return None;
        }

        Some((col as u32, row as u32))
    }

    /// Extent as `(min_x, min_y, max_x, max_y)` in CRS units.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(w, 0.0),
            self.transform.apply(0.0, h),
            self.transform.apply(w, h),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

/// A single-band raster that can be read one pixel at a time.
///
/// Implementations need not be `Sync`; the catalog serializes access to
/// each source behind its own lock.
pub trait RasterSource: Send {
    /// Georeferencing of this raster.
    fn metadata(&self) -> &RasterMetadata;

    /// Reads the raw band-1 value at `(col, row)`.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if the pixel cannot be decoded.
    fn read_pixel(&mut self, col: u32, row: u32) -> Result<f64, RasterError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RasterMetadata {
        RasterMetadata {
            crs: Crs::WGS84,
            nodata: None,
            transform: GeoTransform::north_up(40.0, 12.0, 0.5, 0.25),
            width: 10,
            height: 8,
        }
    }

    #[test]
    fn maps_coordinates_to_nearest_containing_cell() {
        let meta = metadata();
        assert_eq!(meta.cell_at(40.1, 11.9), Some((0, 0)));
        assert_eq!(meta.cell_at(41.24, 11.5), Some((2, 2)));
        assert_eq!(meta.cell_at(44.99, 10.01), Some((9, 7)));
    }

    #[test]
    fn rejects_coordinates_outside_extent() {
        let meta = metadata();
        assert_eq!(meta.cell_at(39.9, 11.0), None);
        assert_eq!(meta.cell_at(45.0, 11.0), None);
        assert_eq!(meta.cell_at(41.0, 12.1), None);
        assert_eq!(meta.cell_at(41.0, 10.0), None);
    }

    #[test]
    fn inverts_its_own_mapping() {
        let transform = GeoTransform([500_000.0, 30.0, 0.0, 250_000.0, 0.0, -30.0]);
        let (x, y) = transform.apply(12.5, 7.25);
        let (col, row) = transform.invert(x, y).unwrap();
        assert!((col - 12.5).abs() < 1e-9);
        assert!((row - 7.25).abs() < 1e-9);
    }

    #[test]
    fn degenerate_transform_is_not_invertible() {
        assert!(GeoTransform([0.0; 6]).invert(1.0, 1.0).is_none());
    }

    #[test]
    fn builds_from_scale_and_tiepoint() {
        let t = GeoTransform::from_scale_and_tiepoint(
            &[1000.0, 1000.0, 0.0],
            &[0.0, 0.0, 0.0, 400_000.0, 400_000.0, 0.0],
        )
        .unwrap();
        assert_eq!(t, GeoTransform::north_up(400_000.0, 400_000.0, 1000.0, 1000.0));
        assert_eq!(t.resolution(), (1000.0, 1000.0));
    }

    #[test]
    fn builds_from_model_transformation() {
        let matrix = [
            10.0, 0.0, 0.0, 100.0, //
            0.0, -10.0, 0.0, 200.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = GeoTransform::from_model_transformation(&matrix).unwrap();
        assert_eq!(t, GeoTransform::north_up(100.0, 200.0, 10.0, 10.0));
    }

    #[test]
    fn short_georeference_tags_are_rejected() {
        assert!(GeoTransform::from_scale_and_tiepoint(&[1.0], &[0.0; 6]).is_err());
        assert!(GeoTransform::from_model_transformation(&[1.0; 4]).is_err());
    }

    #[test]
    fn computes_bounds() {
        let (min_x, min_y, max_x, max_y) = metadata().bounds();
        assert_eq!((min_x, min_y, max_x, max_y), (40.0, 10.0, 45.0, 12.0));
    }
}
