//! Validated pixel grids.

use std::hash::{Hash, Hasher};

use image::RgbImage;
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{PmugError, Result};

use super::Pixel;

/// Smallest allowed matrix dimension.
pub const MIN_DIMENSION: u32 = 1;

/// Largest allowed matrix dimension.
pub const MAX_DIMENSION: u32 = 128;

/// Check that a `width × height` pair is within the supported range.
pub fn check_dimensions(width: u32, height: u32) -> Result<()> {
    let in_range = |v: u32| (MIN_DIMENSION..=MAX_DIMENSION).contains(&v);
    if in_range(width) && in_range(height) {
        Ok(())
    } else {
        Err(PmugError::Validation {
            message: format!(
                "Dimensions {}x{} are out of range",
                width, height
            ),
            help: Some(format!(
                "Width and height must each be between {} and {}",
                MIN_DIMENSION, MAX_DIMENSION
            )),
        })
    }
}

/// An immutable, rectangular grid of pixels.
///
/// Stored row-major. Every constructor validates the dimensions, so a
/// `PixelMatrix` always has `height` rows of exactly `width` pixels with
/// both dimensions in `1..=128`.
///
/// A matrix built from hex strings keeps them as written and serializes
/// them back unchanged. Equality compares colours only.
#[derive(Debug, Clone)]
pub struct PixelMatrix {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
    /// Source hex strings, one per pixel.
    spelling: Option<Vec<String>>,
}

impl PixelMatrix {
    /// Build a matrix from rows, checking them against the declared size.
    pub fn from_rows(rows: Vec<Vec<Pixel>>, width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        check_grid_shape(rows.len(), |y| rows[y].len(), width, height)?;

        let pixels = rows.into_iter().flatten().collect();
        Ok(Self {
            width,
            height,
            pixels,
            spelling: None,
        })
    }

    /// Attach the hex strings the pixels were parsed from, row-major.
    ///
    /// Each string must name its pixel's colour; only letter case may
    /// differ from [`Pixel::to_hex`].
    pub fn with_hex_spelling(mut self, cells: Vec<String>) -> Result<Self> {
        if cells.len() != self.pixels.len() {
            return Err(PmugError::validation(format!(
                "Got {} hex strings for {} pixels",
                cells.len(),
                self.pixels.len()
            )));
        }
        if let Some(i) = self
            .pixels
            .iter()
            .zip(&cells)
            .position(|(p, cell)| !cell.eq_ignore_ascii_case(&p.to_hex()))
        {
            return Err(PmugError::validation(format!(
                "Hex string {:?} does not match pixel {}",
                cells[i], self.pixels[i]
            )));
        }

        self.spelling = Some(cells);
        Ok(self)
    }

    /// A matrix of a single colour.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            pixels: vec![pixel; (width * height) as usize],
            spelling: None,
        })
    }

    /// Copy an RGB image into a matrix.
    pub fn from_image(image: &RgbImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self {
            width: image.width(),
            height: image.height(),
            pixels: image.pixels().map(|p| Pixel::from(*p)).collect(),
            spelling: None,
        })
    }

    /// Convert to an RGB image buffer.
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            self.pixels[self.offset(x, y)].into()
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Dimensions as `(width, height)`.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get the pixel at `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> Option<Pixel> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.offset(x, y)])
        } else {
            None
        }
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        self.pixels.chunks(self.width as usize)
    }

    /// The four corner pixels: top-left, top-right, bottom-left, bottom-right.
    pub fn corners(&self) -> [Pixel; 4] {
        let (w, h) = (self.width - 1, self.height - 1);
        [
            self.pixels[self.offset(0, 0)],
            self.pixels[self.offset(w, 0)],
            self.pixels[self.offset(0, h)],
            self.pixels[self.offset(w, h)],
        ]
    }

    /// Rows as `#RRGGBB` strings, in the source spelling when known.
    pub fn to_hex_rows(&self) -> Vec<Vec<String>> {
        let width = self.width as usize;
        match &self.spelling {
            Some(cells) => cells.chunks(width).map(<[String]>::to_vec).collect(),
            None => self
                .rows()
                .map(|row| row.iter().map(|p| p.to_hex()).collect())
                .collect(),
        }
    }

    /// Flat `RGBRGB...` buffer.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_rgb()).collect()
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }
}

/// Check that a grid of `row_count` rows, with row lengths given by
/// `row_len`, matches the declared size exactly.
pub(crate) fn check_grid_shape(
    row_count: usize,
    row_len: impl Fn(usize) -> usize,
    width: u32,
    height: u32,
) -> Result<()> {
    if row_count != height as usize {
        return Err(PmugError::Validation {
            message: format!("Grid has {} rows, expected height {}", row_count, height),
            help: Some("The number of rows must equal the declared height".to_string()),
        });
    }

    for y in 0..row_count {
        let len = row_len(y);
        if len != width as usize {
            return Err(PmugError::Validation {
                message: format!("Row {} has {} pixels, expected width {}", y, len, width),
                help: Some("Every row must contain exactly `width` pixels".to_string()),
            });
        }
    }

    Ok(())
}

impl PartialEq for PixelMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.pixels == other.pixels
    }
}

impl Eq for PixelMatrix {}

impl Hash for PixelMatrix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.hash(state);
        self.height.hash(state);
        self.pixels.hash(state);
    }
}

impl Serialize for PixelMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.height as usize))?;
        match &self.spelling {
            Some(cells) => {
                for row in cells.chunks(self.width as usize) {
                    seq.serialize_element(row)?;
                }
            }
            None => {
                for row in self.rows() {
                    seq.serialize_element(row)?;
                }
            }
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> PixelMatrix {
        PixelMatrix::from_rows(
            vec![
                vec![Pixel::BLACK, Pixel::WHITE, Pixel::BLACK],
                vec![Pixel::WHITE, Pixel::BLACK, Pixel::rgb(1, 2, 3)],
            ],
            3,
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows() {
        let m = checker();
        assert_eq!(m.size(), (3, 2));
        assert_eq!(m.pixel_count(), 6);
        assert_eq!(m.get(2, 1), Some(Pixel::rgb(1, 2, 3)));
        assert_eq!(m.get(3, 0), None);
    }

    #[test]
    fn test_from_rows_shape_mismatch() {
        let short_row = vec![vec![Pixel::BLACK, Pixel::BLACK], vec![Pixel::BLACK]];
        assert!(PixelMatrix::from_rows(short_row, 2, 2).is_err());

        let too_few_rows = vec![vec![Pixel::BLACK, Pixel::BLACK]];
        assert!(PixelMatrix::from_rows(too_few_rows, 2, 2).is_err());
    }

    #[test]
    fn test_dimension_range() {
        assert!(check_dimensions(1, 1).is_ok());
        assert!(check_dimensions(128, 128).is_ok());
        assert!(check_dimensions(0, 16).is_err());
        assert!(check_dimensions(16, 129).is_err());
    }

    #[test]
    fn test_corners() {
        let m = checker();
        assert_eq!(
            m.corners(),
            [Pixel::BLACK, Pixel::BLACK, Pixel::WHITE, Pixel::rgb(1, 2, 3)]
        );
    }

    #[test]
    fn test_image_round_trip() {
        let m = checker();
        let img = m.to_image();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1).0, [1, 2, 3]);
        assert_eq!(PixelMatrix::from_image(&img).unwrap(), m);
    }

    #[test]
    fn test_serialize_as_hex_rows() {
        let m = PixelMatrix::from_rows(vec![vec![Pixel::rgb(255, 0, 0), Pixel::WHITE]], 2, 1)
            .unwrap();
        assert_eq!(
            serde_json::to_string(&m).unwrap(),
            r##"[["#FF0000","#FFFFFF"]]"##
        );
    }

    #[test]
    fn test_hex_spelling_is_kept() {
        let m = PixelMatrix::from_rows(vec![vec![Pixel::rgb(0xAB, 0xCD, 0xEF), Pixel::WHITE]], 2, 1)
            .unwrap()
            .with_hex_spelling(vec!["#abCDef".into(), "#ffffff".into()])
            .unwrap();

        assert_eq!(m.to_hex_rows(), vec![vec!["#abCDef".to_string(), "#ffffff".to_string()]]);
        assert_eq!(
            serde_json::to_string(&m).unwrap(),
            r##"[["#abCDef","#ffffff"]]"##
        );
    }

    #[test]
    fn test_hex_spelling_must_match_pixels() {
        let m = || PixelMatrix::from_rows(vec![vec![Pixel::BLACK]], 1, 1).unwrap();
        assert!(m().with_hex_spelling(vec!["#000001".into()]).is_err());
        assert!(m().with_hex_spelling(vec![]).is_err());
    }

    #[test]
    fn test_equality_ignores_spelling() {
        let plain = PixelMatrix::from_rows(vec![vec![Pixel::WHITE]], 1, 1).unwrap();
        let spelled = plain.clone().with_hex_spelling(vec!["#ffffff".into()]).unwrap();
        assert_eq!(plain, spelled);
    }
}
