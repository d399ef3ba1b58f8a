//! Decoding of single-band GeoTIFF coverages and nearest-pixel sampling.
//!
//! The raster service returns a small tile (10×10 by default) covering the
//! requested bounding box. Pixels are laid out row-major with row 0 at the
//! north edge and column 0 at the west edge; pixel `(row, col)` covers the
//! cell whose centre is at
//! `(west + (col + 0.5) * dx, north - (row + 0.5) * dy)`.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::coords::BoundingBox;
use crate::error::{Result, SoilError};

/// GDAL's private TIFF tag carrying the nodata value as ASCII.
const GDAL_NODATA_TAG: u16 = 42113;

/// A decoded raster tile georeferenced by its bounding box.
#[derive(Debug, Clone)]
pub struct RasterTile {
    values: Vec<f64>,
    width: usize,
    height: usize,
    bbox: BoundingBox,
    nodata: Option<f64>,
}

impl RasterTile {
    /// Build a tile from raw row-major values.
    pub fn new(
        values: Vec<f64>,
        width: usize,
        height: usize,
        bbox: BoundingBox,
        nodata: Option<f64>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || values.len() != width * height {
            return Err(SoilError::Raster(format!(
                "{} values do not fill a {}x{} grid",
                values.len(),
                width,
                height
            )));
        }
        Ok(Self {
            values,
            width,
            height,
            bbox,
            nodata,
        })
    }

    /// Decode a GeoTIFF file covering `bbox`.
    pub fn from_file<P: AsRef<Path>>(path: P, bbox: BoundingBox) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), bbox)
    }

    /// Decode a GeoTIFF stream covering `bbox`.
    ///
    /// Only the first band of the first image is read. Integer and float
    /// sample formats are widened to `f64`.
    pub fn from_reader<R: Read + Seek>(reader: R, bbox: BoundingBox) -> Result<Self> {
        let mut decoder = Decoder::new(reader).map_err(raster_err)?;
        let (width, height) = decoder.dimensions().map_err(raster_err)?;

        let nodata = decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA_TAG))
            .ok()
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f64>().ok());

        let values = widen(decoder.read_image().map_err(raster_err)?)?;

        // Multi-band images interleave samples; keep the first band only.
        let pixels = width as usize * height as usize;
        let values = if values.len() > pixels && pixels > 0 && values.len() % pixels == 0 {
            let bands = values.len() / pixels;
            values.into_iter().step_by(bands).collect()
        } else {
            values
        };

        Self::new(values, width as usize, height as usize, bbox, nodata)
    }

    /// Value of the pixel whose centre is nearest to `(lon, lat)`.
    ///
    /// Points outside the bounding box clamp to the edge pixel.
    ///
    /// # Returns
    ///
    /// `None` when the pixel holds the nodata value or NaN.
    pub fn sample_nearest(&self, lon: f64, lat: f64) -> Option<f64> {
        let (row, col) = self.pixel_for(lon, lat);
        let value = self.values[row * self.width + col];

        if value.is_nan() || self.nodata.is_some_and(|nd| value == nd) {
            None
        } else {
            Some(value)
        }
    }

    /// Row/column index of the pixel nearest to `(lon, lat)`.
    fn pixel_for(&self, lon: f64, lat: f64) -> (usize, usize) {
        let dx = self.bbox.width() / self.width as f64;
        let dy = self.bbox.height() / self.height as f64;

        let col = ((lon - self.bbox.west) / dx - 0.5).round();
        let row = ((self.bbox.north - lat) / dy - 0.5).round();

        let col = col.clamp(0.0, (self.width - 1) as f64) as usize;
        let row = row.clamp(0.0, (self.height - 1) as f64) as usize;
        (row, col)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn nodata(&self) -> Option<f64> {
        self.nodata
    }
}

fn raster_err(e: tiff::TiffError) -> SoilError {
    SoilError::Raster(e.to_string())
}

#[allow(unreachable_patterns)]
fn widen(result: DecodingResult) -> Result<Vec<f64>> {
    let values = match result {
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
        _ => return Err(SoilError::Raster("unsupported sample format".to_string())),
    };
    Ok(values)
}
