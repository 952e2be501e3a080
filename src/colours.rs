//! Text/background colour pairs for scrolling text on the panel.
//!
//! Pairs are derived from a seed, so the same seed always yields the same
//! colours.

use std::fmt;

use palette::{Hsv, IntoColor, Srgb};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::Pixel;

/// How the background relates to the text colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastStrategy {
    /// Opposite hue, muted and dark.
    Complementary,
    /// A third of the wheel away, moderately muted.
    Triadic,
    /// Near the text hue, almost grey and very dark.
    LowSaturation,
}

impl ContrastStrategy {
    const ALL: [ContrastStrategy; 3] = [
        ContrastStrategy::Complementary,
        ContrastStrategy::Triadic,
        ContrastStrategy::LowSaturation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContrastStrategy::Complementary => "complementary",
            ContrastStrategy::Triadic => "triadic",
            ContrastStrategy::LowSaturation => "low_saturation",
        }
    }
}

impl fmt::Display for ContrastStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated text colour with its background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColourPair {
    pub text: Pixel,
    pub background: Pixel,
    pub strategy: ContrastStrategy,
}

impl ColourPair {
    /// Text colour as `0xRRGGBB`.
    pub fn text_decimal(&self) -> u32 {
        self.text.to_decimal()
    }

    /// Background colour as `0xRRGGBB`.
    pub fn background_decimal(&self) -> u32 {
        self.background.to_decimal()
    }
}

/// Generator seeded from the sha256 of `seed`.
fn seeded_rng(seed: &str) -> StdRng {
    StdRng::from_seed(Sha256::digest(seed.as_bytes()).into())
}

/// Vibrant text colour: any hue, high saturation and value.
fn text_colour(rng: &mut StdRng) -> (f32, Pixel) {
    let hue = rng.gen::<f32>();
    let pixel = hsv_pixel(hue, rng.gen_range(0.7f32..1.0), rng.gen_range(0.6f32..1.0));
    (hue, pixel)
}

/// Generate a colour pair from `seed`.
pub fn generate_pair(seed: &str) -> ColourPair {
    let mut rng = seeded_rng(seed);

    let (hue, text) = text_colour(&mut rng);
    let strategy = ContrastStrategy::ALL[rng.gen_range(0..ContrastStrategy::ALL.len())];
    let background = background_for(hue, strategy, &mut rng);

    ColourPair {
        text,
        background,
        strategy,
    }
}

/// Generate a pair with a fixed strategy.
pub fn generate_pair_with(seed: &str, strategy: ContrastStrategy) -> ColourPair {
    let mut rng = seeded_rng(seed);

    let (hue, text) = text_colour(&mut rng);
    let background = background_for(hue, strategy, &mut rng);

    ColourPair {
        text,
        background,
        strategy,
    }
}

fn background_for(text_hue: f32, strategy: ContrastStrategy, rng: &mut StdRng) -> Pixel {
    let (hue, saturation, value) = match strategy {
        ContrastStrategy::Complementary => (
            text_hue + 0.5,
            rng.gen_range(0.3f32..0.6),
            rng.gen_range(0.1f32..0.4),
        ),
        ContrastStrategy::Triadic => {
            let offset = if rng.gen_bool(0.5) { 1.0 / 3.0 } else { -1.0 / 3.0 };
            (text_hue + offset, rng.gen_range(0.4f32..0.7), rng.gen_range(0.2f32..0.5))
        }
        ContrastStrategy::LowSaturation => (
            text_hue + rng.gen_range(-0.1f32..0.1),
            rng.gen_range(0.1f32..0.3),
            rng.gen_range(0.1f32..0.3),
        ),
    };
    hsv_pixel(hue.rem_euclid(1.0), saturation, value)
}

/// `hue` is a fraction of a turn.
fn hsv_pixel(hue: f32, saturation: f32, value: f32) -> Pixel {
    let hsv = Hsv::new(hue * 360.0, saturation, value);
    let rgb: Srgb<f32> = hsv.into_color();
    Pixel::rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0).round() as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8,
    )
}
