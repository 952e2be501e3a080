//! Core domain types for pmug.
//!
//! - `Pixel` - RGB colour parsed from `#RRGGBB` or integer tuples
//! - `PixelMatrix` - validated rectangular grid of pixels
//! - `Palette` - up to 16 indexable colours

mod matrix;
mod palette;
mod pixel;

pub(crate) use matrix::check_grid_shape;
pub use matrix::{check_dimensions, PixelMatrix, MAX_DIMENSION, MIN_DIMENSION};
pub use palette::{Palette, MAX_PALETTE_SIZE};
pub use pixel::{rgb_to_decimal, Pixel};
