//! `GeoTIFF` raster source.
//!
//! Reads the georeferencing tags once at open and decodes band-1 pixels on
//! demand, one TIFF chunk (strip or tile) at a time. Decoded chunks are
//! kept in a small cache so neighbouring lookups do not re-decompress.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::{PlanarConfiguration, Tag};

use crate::RasterError;
use crate::crs::Crs;
use crate::source::{GeoTransform, RasterMetadata, RasterSource};

/// Maximum number of decoded chunks kept per source.
const CHUNK_CACHE_LIMIT: usize = 64;

/// `GeoKey` ids.
const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// `GTModelTypeGeoKey` values.
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// `GTRasterTypeGeoKey` value for grids georeferenced at pixel centres.
const RASTER_PIXEL_IS_POINT: u16 = 2;

/// `GeoKey` value meaning "user-defined", which carries no EPSG code.
const USER_DEFINED: u16 = 32767;

/// How the image is split into chunks.
#[derive(Debug, Clone, Copy)]
enum ChunkLayout {
    Stripped { rows_per_strip: u32 },
    Tiled { tile_width: u32, tile_height: u32, tiles_across: u32 },
}

/// Summary statistics over the valid cells of band 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    /// Number of cells that are finite and not nodata.
    pub valid_cells: u64,
    /// Total number of cells.
    pub total_cells: u64,
    /// Minimum valid value.
    pub min: Option<f64>,
    /// Maximum valid value.
    pub max: Option<f64>,
    /// Mean of valid values.
    pub mean: Option<f64>,
}

/// A single-band `GeoTIFF` opened from disk.
pub struct GeoTiffSource {
    decoder: Decoder<BufReader<File>>,
    metadata: RasterMetadata,
    layout: ChunkLayout,
    /// Interleaved samples per pixel inside one chunk.
    sample_step: usize,
    chunks_per_band: u32,
    cache: BTreeMap<u32, Vec<f64>>,
}

impl std::fmt::Debug for GeoTiffSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffSource")
            .field("metadata", &self.metadata)
            .field("layout", &self.layout)
            .field("cached_chunks", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl GeoTiffSource {
    /// Opens `path` and reads its georeferencing.
    ///
    /// # Errors
    ///
    /// * If the file cannot be opened or is not a valid TIFF
    /// * If it carries no usable pixel-to-model transform
    /// * If its CRS is user-defined
    pub fn open(path: &Path) -> Result<Self, RasterError> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        let (width, height) = decoder.dimensions()?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();

        let layout = if chunk_width >= width {
            ChunkLayout::Stripped {
                rows_per_strip: chunk_height.max(1),
            }
        } else {
            ChunkLayout::Tiled {
                tile_width: chunk_width,
                tile_height: chunk_height,
                tiles_across: width.div_ceil(chunk_width),
            }
        };

        let samples_per_pixel = decoder
            .find_tag_unsigned::<u16>(Tag::SamplesPerPixel)?
            .unwrap_or(1)
            .max(1);
        let planar = decoder
            .find_tag_unsigned::<u16>(Tag::PlanarConfiguration)?
            .and_then(PlanarConfiguration::from_u16)
            .unwrap_or(PlanarConfiguration::Chunky);
        let sample_step = match planar {
            PlanarConfiguration::Planar => 1,
            _ => usize::from(samples_per_pixel),
        };

        let chunks_per_band = width.div_ceil(chunk_width.max(1)) * height.div_ceil(chunk_height.max(1));

        let geo_keys = read_geo_keys(&mut decoder)?;

        let mut transform = read_transform(&mut decoder)?;
        if geo_keys.as_ref().is_some_and(is_pixel_is_point) {
            log::debug!(
                "{} is georeferenced at pixel centres, shifting the origin by half a pixel",
                path.display()
            );
            transform = transform.shifted_to_pixel_corner();
        }

        let metadata = RasterMetadata {
            crs: read_crs(geo_keys.as_ref(), path)?,
            nodata: read_nodata(&mut decoder, path)?,
            transform,
            width,
            height,
        };

        log::debug!(
            "Opened {}: {}x{} {} ({}x{} chunks, {} samples/pixel)",
            path.display(),
            width,
            height,
            metadata.crs,
            chunk_width,
            chunk_height,
            samples_per_pixel,
        );

        Ok(Self {
            decoder,
            metadata,
            layout,
            sample_step,
            chunks_per_band,
            cache: BTreeMap::new(),
        })
    }

    /// Scans every band-1 chunk and summarizes the valid cells.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError`] if any chunk fails to decode.
    #[allow(clippy::cast_precision_loss)]
    pub fn band_statistics(&mut self) -> Result<BandStatistics, RasterError> {
        let nodata = self.metadata.nodata;
        let mut valid_cells = 0_u64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;

        for chunk_index in 0..self.chunks_per_band {
            let values = self.decode_chunk(chunk_index)?;
            for &value in values.iter().step_by(self.sample_step) {
                if !value.is_finite() || nodata.is_some_and(|n| crate::is_nodata(value, n)) {
                    continue;
                }
                valid_cells += 1;
                min = min.min(value);
                max = max.max(value);
                sum += value;
            }
        }

        let total_cells = u64::from(self.metadata.width) * u64::from(self.metadata.height);
        let has_valid = valid_cells > 0;

        Ok(BandStatistics {
            valid_cells,
            total_cells,
            min: has_valid.then_some(min),
            max: has_valid.then_some(max),
            mean: has_valid.then(|| sum / valid_cells as f64),
        })
    }

    fn locate(&self, col: u32, row: u32) -> (u32, u32, u32) {
        match self.layout {
            ChunkLayout::Stripped { rows_per_strip } => {
                (row / rows_per_strip, row % rows_per_strip, col)
            }
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
                tiles_across,
            } => (
                (row / tile_height) * tiles_across + col / tile_width,
                row % tile_height,
                col % tile_width,
            ),
        }
    }

    fn decode_chunk(&mut self, chunk_index: u32) -> Result<Vec<f64>, RasterError> {
        let decoded = self.decoder.read_chunk(chunk_index)?;
        decoding_result_to_f64(decoded)
    }
}

impl RasterSource for GeoTiffSource {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_pixel(&mut self, col: u32, row: u32) -> Result<f64, RasterError> {
        if col >= self.metadata.width || row >= self.metadata.height {
            return Err(RasterError::PixelOutOfRange { col, row });
        }

        let (chunk_index, local_row, local_col) = self.locate(col, row);
        let (stride, _) = self.decoder.chunk_data_dimensions(chunk_index);

        if !self.cache.contains_key(&chunk_index) {
            if self.cache.len() >= CHUNK_CACHE_LIMIT {
                self.cache.clear();
            }
            let values = self.decode_chunk(chunk_index)?;
            self.cache.insert(chunk_index, values);
        }

        let index = (local_row as usize * stride as usize + local_col as usize) * self.sample_step;

        self.cache
            .get(&chunk_index)
            .and_then(|values| values.get(index))
            .copied()
            .ok_or(RasterError::PixelOutOfRange { col, row })
    }
}

#[allow(clippy::cast_precision_loss)]
fn decoding_result_to_f64(decoded: DecodingResult) -> Result<Vec<f64>, RasterError> {
    #[allow(unreachable_patterns)]
    let values = match decoded {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => {
            return Err(RasterError::Decode {
                reason: "unsupported sample format".to_string(),
            });
        }
    };

    Ok(values)
}

fn read_transform(decoder: &mut Decoder<BufReader<File>>) -> Result<GeoTransform, RasterError> {
    if let Some(matrix) = decoder.find_tag(Tag::ModelTransformationTag)? {
        return GeoTransform::from_model_transformation(&matrix.into_f64_vec()?);
    }

    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;

    match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => {
            GeoTransform::from_scale_and_tiepoint(&scale.into_f64_vec()?, &tiepoint.into_f64_vec()?)
        }
        _ => Err(RasterError::MissingGeoreference {
            reason: "no model transformation or pixel scale and tiepoint tags".to_string(),
        }),
    }
}

fn read_geo_keys(
    decoder: &mut Decoder<BufReader<File>>,
) -> Result<Option<BTreeMap<u16, u16>>, RasterError> {
    let Some(directory) = decoder.find_tag(Tag::GeoKeyDirectoryTag)? else {
        return Ok(None);
    };

    Ok(Some(parse_geo_keys(&directory.into_u16_vec()?)))
}

fn read_crs(keys: Option<&BTreeMap<u16, u16>>, path: &Path) -> Result<Crs, RasterError> {
    let Some(keys) = keys else {
        log::warn!(
            "{} has no GeoKey directory, assuming {}",
            path.display(),
            Crs::WGS84
        );
        return Ok(Crs::WGS84);
    };

    crs_from_geo_keys(keys, path)
}

fn is_pixel_is_point(keys: &BTreeMap<u16, u16>) -> bool {
    keys.get(&KEY_RASTER_TYPE) == Some(&RASTER_PIXEL_IS_POINT)
}

/// Decodes the short-valued entries of a `GeoKeyDirectory`.
///
/// Entries stored in other tags (doubles, ASCII) are skipped; the CRS keys
/// are always short-valued.
fn parse_geo_keys(directory: &[u16]) -> BTreeMap<u16, u16> {
    let count = directory.get(3).copied().unwrap_or(0) as usize;

    directory
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .take(count)
        .filter(|entry| entry[1] == 0 && entry[2] == 1)
        .map(|entry| (entry[0], entry[3]))
        .collect()
}

fn crs_from_geo_keys(keys: &BTreeMap<u16, u16>, path: &Path) -> Result<Crs, RasterError> {
    let model_type = keys.get(&KEY_MODEL_TYPE).copied();
    let projected = keys.get(&KEY_PROJECTED_CS_TYPE).copied();
    let geographic = keys.get(&KEY_GEOGRAPHIC_TYPE).copied();

    let code = match model_type {
        Some(MODEL_TYPE_PROJECTED) => projected,
        Some(MODEL_TYPE_GEOGRAPHIC) => geographic,
        _ => projected.or(geographic),
    };

    match code {
        Some(USER_DEFINED) => Err(RasterError::UnsupportedCrs(format!(
            "{} uses a user-defined CRS",
            path.display()
        ))),
        Some(code) => Ok(Crs::Epsg(u32::from(code))),
        None => {
            log::warn!(
                "{} has no EPSG GeoKey, assuming {}",
                path.display(),
                Crs::WGS84
            );
            Ok(Crs::WGS84)
        }
    }
}

fn read_nodata(
    decoder: &mut Decoder<BufReader<File>>,
    path: &Path,
) -> Result<Option<f64>, RasterError> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };

    let text = value.into_string()?;
    let nodata = parse_nodata(&text);
    if nodata.is_none() {
        log::warn!(
            "{} has an unparseable nodata value {text:?}, ignoring it",
            path.display()
        );
    }

    Ok(nodata)
}

fn parse_nodata(text: &str) -> Option<f64> {
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f64>()
        .ok()
}
