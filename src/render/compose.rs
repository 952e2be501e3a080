//! Aspect-preserving compositing onto a fixed device canvas.
//!
//! A source frame is scaled by `min(canvasW / srcW, canvasH / srcH)` with
//! nearest-neighbour sampling, centred, and the margins are filled with a
//! colour taken from the source frame's four corners.

use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{PmugError, Result};
use crate::types::{Pixel, PixelMatrix};

/// The LED panel resolution animations are normalized to.
pub const DEVICE_CANVAS: CanvasSize = CanvasSize {
    width: 32,
    height: 16,
};

/// Size of a target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        DEVICE_CANVAS
    }
}

/// Where a scaled frame lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Placement {
    /// Compute the placement of a `src_width × src_height` frame.
    ///
    /// The axis with the smaller ratio is scaled to the canvas edge exactly;
    /// the other is floored. Comparisons use integer cross-multiplication so
    /// exact ratios never lose a pixel to float rounding.
    pub fn compute(src_width: u32, src_height: u32, canvas: CanvasSize) -> Self {
        let (sw, sh) = (src_width as u64, src_height as u64);
        let (cw, ch) = (canvas.width as u64, canvas.height as u64);

        let (scaled_width, scaled_height, scale) = if cw * sh <= ch * sw {
            (cw, sh * cw / sw, cw as f64 / sw as f64)
        } else {
            (sw * ch / sh, ch, ch as f64 / sh as f64)
        };

        // Extreme aspect ratios would floor to zero
        let scaled_width = scaled_width.clamp(1, cw) as u32;
        let scaled_height = scaled_height.clamp(1, ch) as u32;

        Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: (canvas.width - scaled_width) / 2,
            offset_y: (canvas.height - scaled_height) / 2,
        }
    }
}

/// Margin colour for a frame with the given corners.
///
/// Identical corners give that colour; otherwise the floor of the
/// component-wise average.
pub fn fill_colour(corners: [Pixel; 4]) -> Pixel {
    if corners.iter().all(|c| *c == corners[0]) {
        corners[0]
    } else {
        Pixel::average(&corners)
    }
}

/// A composited canvas plus the geometry that produced it.
#[derive(Debug, Clone)]
pub struct Composition {
    pub image: RgbImage,
    pub placement: Placement,
    pub fill: Pixel,
}

impl Composition {
    /// The canvas as a pixel matrix.
    pub fn to_matrix(&self) -> Result<PixelMatrix> {
        PixelMatrix::from_image(&self.image)
    }
}

/// Composites frames onto a fixed canvas.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    canvas: CanvasSize,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEVICE_CANVAS)
    }
}

impl Compositor {
    pub fn new(canvas: CanvasSize) -> Self {
        Self { canvas }
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    /// Composite a normalized frame.
    pub fn composite(&self, frame: &PixelMatrix) -> Result<Composition> {
        self.composite_image(&frame.to_image())
    }

    /// Composite an RGB image of any size.
    pub fn composite_image(&self, source: &RgbImage) -> Result<Composition> {
        let (src_width, src_height) = source.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(PmugError::validation("Cannot composite an empty frame"));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(PmugError::validation("Canvas dimensions must be non-zero"));
        }

        let placement = Placement::compute(src_width, src_height, self.canvas);

        let corners: [Pixel; 4] = [
            (*source.get_pixel(0, 0)).into(),
            (*source.get_pixel(src_width - 1, 0)).into(),
            (*source.get_pixel(0, src_height - 1)).into(),
            (*source.get_pixel(src_width - 1, src_height - 1)).into(),
        ];
        let fill = fill_colour(corners);

        let scaled = if (placement.scaled_width, placement.scaled_height) == (src_width, src_height)
        {
            source.clone()
        } else {
            imageops::resize(
                source,
                placement.scaled_width,
                placement.scaled_height,
                FilterType::Nearest,
            )
        };

        let mut image = RgbImage::from_pixel(self.canvas.width, self.canvas.height, fill.into());
        imageops::replace(
            &mut image,
            &scaled,
            placement.offset_x as i64,
            placement.offset_y as i64,
        );

        tracing::debug!(
            src = %format!("{}x{}", src_width, src_height),
            scaled = %format!("{}x{}", placement.scaled_width, placement.scaled_height),
            offset_x = placement.offset_x,
            offset_y = placement.offset_y,
            fill = %fill,
            "composited frame"
        );

        Ok(Composition {
            image,
            placement,
            fill,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RED: Pixel = Pixel::rgb(255, 0, 0);
    const GREEN: Pixel = Pixel::rgb(0, 255, 0);
    const BLUE: Pixel = Pixel::rgb(0, 0, 255);

    fn two_by_two(a: Pixel, b: Pixel, c: Pixel, d: Pixel) -> PixelMatrix {
        PixelMatrix::from_rows(vec![vec![a, b], vec![c, d]], 2, 2).unwrap()
    }

    #[test]
    fn test_two_by_two_onto_device_canvas() {
        let frame = two_by_two(RED, GREEN, BLUE, Pixel::WHITE);
        let out = Compositor::default().composite(&frame).unwrap();

        assert_eq!(out.placement.scale, 8.0);
        assert_eq!(
            (out.placement.scaled_width, out.placement.scaled_height),
            (16, 16)
        );
        assert_eq!((out.placement.offset_x, out.placement.offset_y), (8, 0));
        assert_eq!(out.image.dimensions(), (32, 16));

        // Scaled frame corners land inside the pasted region
        assert_eq!(Pixel::from(*out.image.get_pixel(8, 0)), RED);
        assert_eq!(Pixel::from(*out.image.get_pixel(23, 0)), GREEN);
        assert_eq!(Pixel::from(*out.image.get_pixel(8, 15)), BLUE);
        assert_eq!(Pixel::from(*out.image.get_pixel(23, 15)), Pixel::WHITE);

        // Margins use the floor average of the corners
        let fill = Pixel::rgb(127, 127, 127);
        assert_eq!(out.fill, fill);
        assert_eq!(Pixel::from(*out.image.get_pixel(0, 0)), fill);
        assert_eq!(Pixel::from(*out.image.get_pixel(31, 15)), fill);
    }

    #[test]
    fn test_identical_corners_fill() {
        let frame = two_by_two(BLUE, BLUE, BLUE, BLUE);
        let out = Compositor::default().composite(&frame).unwrap();
        assert_eq!(out.fill, BLUE);
        assert_eq!(Pixel::from(*out.image.get_pixel(0, 5)), BLUE);
    }

    #[test]
    fn test_wide_source_letterboxed() {
        let frame = PixelMatrix::filled(64, 8, RED).unwrap();
        let out = Compositor::default().composite(&frame).unwrap();
        assert_eq!(out.placement.scaled_width, 32);
        assert_eq!(out.placement.scaled_height, 4);
        assert_eq!(out.placement.offset_y, 6);
    }

    #[test]
    fn test_exact_fit_is_unchanged() {
        let frame = PixelMatrix::filled(32, 16, GREEN).unwrap();
        let out = Compositor::default().composite(&frame).unwrap();
        assert_eq!(out.placement.scale, 1.0);
        assert_eq!(out.to_matrix().unwrap(), frame);
    }

    #[test]
    fn test_extreme_aspect_never_zero() {
        let source = RgbImage::from_pixel(1000, 1, image::Rgb([1, 2, 3]));
        let out = Compositor::default().composite_image(&source).unwrap();
        assert_eq!(out.placement.scaled_width, 32);
        assert_eq!(out.placement.scaled_height, 1);
    }

    #[test]
    fn test_empty_source_rejected() {
        let source = RgbImage::new(0, 0);
        assert!(Compositor::default().composite_image(&source).is_err());
    }

    proptest! {
        #[test]
        fn prop_scale_law(w in 1u32..=300, h in 1u32..=300, cw in 1u32..=64, ch in 1u32..=64) {
            let canvas = CanvasSize::new(cw, ch);
            let p = Placement::compute(w, h, canvas);

            prop_assert!(p.scaled_width <= cw);
            prop_assert!(p.scaled_height <= ch);
            // One axis touches the canvas edge exactly
            prop_assert!(p.scaled_width == cw || p.scaled_height == ch);
            prop_assert_eq!(p.offset_x, (cw - p.scaled_width) / 2);
            prop_assert_eq!(p.offset_y, (ch - p.scaled_height) / 2);

            let expected = (cw as f64 / w as f64).min(ch as f64 / h as f64);
            prop_assert!((p.scale - expected).abs() < 1e-9);
        }

        #[test]
        fn prop_fill_colour_law(corners in proptest::array::uniform4(any::<[u8; 3]>())) {
            let corners = corners.map(|[r, g, b]| Pixel::rgb(r, g, b));
            let fill = fill_colour(corners);
            if corners.iter().all(|c| *c == corners[0]) {
                prop_assert_eq!(fill, corners[0]);
            } else {
                let avg = |f: fn(&Pixel) -> u8| (corners.iter().map(|c| f(c) as u32).sum::<u32>() / 4) as u8;
                prop_assert_eq!(fill, Pixel::rgb(avg(|c| c.r), avg(|c| c.g), avg(|c| c.b)));
            }
        }
    }
}
