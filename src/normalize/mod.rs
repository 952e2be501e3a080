//! Pixel matrix normalization.
//!
//! Converts any supported input encoding into a [`PixelMatrix`] of exactly
//! the requested size:
//!
//! - hex and RGB grids must already have the requested size
//! - palette-indexed grids are expanded through their palette
//! - raster images are decoded and resampled
//!
//! # Example
//!
//! ```
//! use pmug::normalize::{InputFormat, NormalizeOptions, Normalizer};
//!
//! let input = InputFormat::HexGrid(vec![vec!["#FF0000".into(), "#00FF00".into()]]);
//! let normalized = Normalizer::default()
//!     .normalize(&input, &NormalizeOptions::new(2, 1))
//!     .unwrap();
//! assert_eq!(normalized.matrix.size(), (2, 1));
//! ```

mod input;
mod raster;

pub use input::{AnimationInput, FrameInput, InputFormat};
pub use raster::{
    check_raster_text, decode_base64_payload, CodecDecoder, DecodedRaster, HashPatternDecoder,
    RasterDecoder, ResampleMethod,
};

use crate::error::{PmugError, Result};
use crate::types::{check_dimensions, check_grid_shape, Palette, Pixel, PixelMatrix};

/// Default limit on raster input, in base64 characters.
pub const DEFAULT_MAX_RASTER_BYTES: usize = 8 * 1024 * 1024;

/// Target size and resampling for one normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub width: u32,
    pub height: u32,
    pub resample: ResampleMethod,
}

impl NormalizeOptions {
    /// Options for a `width × height` target with nearest-neighbour resampling.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            resample: ResampleMethod::Nearest,
        }
    }

    /// Use a different resampling method for raster input.
    pub fn with_resample(mut self, resample: ResampleMethod) -> Self {
        self.resample = resample;
        self
    }
}

/// The result of normalizing one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub matrix: PixelMatrix,
    /// Source size before resampling; only known for raster input.
    pub original_size: Option<(u32, u32)>,
}

/// Converts input encodings into pixel matrices.
pub struct Normalizer {
    decoder: Box<dyn RasterDecoder>,
    max_raster_bytes: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(Box::new(CodecDecoder))
    }
}

impl Normalizer {
    /// Create a normalizer using the given raster decoder.
    pub fn new(decoder: Box<dyn RasterDecoder>) -> Self {
        Self {
            decoder,
            max_raster_bytes: DEFAULT_MAX_RASTER_BYTES,
        }
    }

    /// Limit the length of base64 raster text.
    pub fn with_max_raster_bytes(mut self, max: usize) -> Self {
        self.max_raster_bytes = max;
        self
    }

    /// Name of the configured raster decoder.
    pub fn decoder_name(&self) -> &'static str {
        self.decoder.name()
    }

    /// Normalize `input` to a `width × height` matrix.
    pub fn normalize(&self, input: &InputFormat, options: &NormalizeOptions) -> Result<Normalized> {
        let (width, height) = (options.width, options.height);
        check_dimensions(width, height)?;

        let normalized = match input {
            InputFormat::HexGrid(rows) => {
                check_grid_shape(rows.len(), |y| rows[y].len(), width, height)?;
                let pixels = map_grid(rows, |cell, x, y| {
                    Pixel::from_hex(cell).map_err(|_| PmugError::Validation {
                        message: format!("Pixel [{}][{}] has invalid hex colour {:?}", y, x, cell),
                        help: Some("Use #RRGGBB format, e.g. #FF8800".to_string()),
                    })
                })?;
                let spelling = rows.iter().flatten().cloned().collect();
                Normalized {
                    matrix: PixelMatrix::from_rows(pixels, width, height)?
                        .with_hex_spelling(spelling)?,
                    original_size: None,
                }
            }
            InputFormat::RgbGrid(rows) => {
                check_grid_shape(rows.len(), |y| rows[y].len(), width, height)?;
                let pixels = map_grid(rows, |cell, x, y| {
                    Pixel::from_components(cell).map_err(|e| {
                        PmugError::validation(format!("Pixel [{}][{}]: {}", y, x, e))
                    })
                })?;
                Normalized {
                    matrix: PixelMatrix::from_rows(pixels, width, height)?,
                    original_size: None,
                }
            }
            InputFormat::PaletteIndexed { palette, pixels } => {
                let palette = Palette::from_hex(palette)?;
                check_grid_shape(pixels.len(), |y| pixels[y].len(), width, height)?;
                let cells = map_grid(pixels, |&index, _, _| palette.entry(index))?;
                let spelling = cells.iter().flatten().map(|(_, s)| s.to_string()).collect();
                let pixels = cells
                    .into_iter()
                    .map(|row| row.into_iter().map(|(colour, _)| colour).collect())
                    .collect();
                Normalized {
                    matrix: PixelMatrix::from_rows(pixels, width, height)?
                        .with_hex_spelling(spelling)?,
                    original_size: None,
                }
            }
            InputFormat::Base64Raster(text) => {
                check_raster_text(text, self.max_raster_bytes)?;
                let bytes = decode_base64_payload(text)?;
                let decoded = self
                    .decoder
                    .decode(&bytes, width, height, options.resample)?;
                Normalized {
                    matrix: PixelMatrix::from_image(&decoded.image)?,
                    original_size: Some(decoded.original_size),
                }
            }
        };

        tracing::debug!(
            format = input.name(),
            width,
            height,
            decoder = self.decoder.name(),
            "normalized image"
        );

        Ok(normalized)
    }
}

fn map_grid<T, U>(
    rows: &[Vec<T>],
    mut f: impl FnMut(&T, usize, usize) -> Result<U>,
) -> Result<Vec<Vec<U>>> {
    rows.iter()
        .enumerate()
        .map(|(y, row)| row.iter().enumerate().map(|(x, cell)| f(cell, x, y)).collect())
        .collect()
}
