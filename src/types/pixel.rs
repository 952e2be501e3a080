//! Pixel type and parsing.

use std::fmt;
use std::str::FromStr;

use image::Rgb;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PmugError, Result};

/// A 24-bit RGB pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Pixel {
    /// Create a pixel from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// White.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Parse a `#RRGGBB` colour.
    ///
    /// Only the six-digit form with a leading `#` is accepted; the device
    /// protocol has no shorthand or alpha forms.
    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').ok_or_else(|| invalid_hex(s))?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid_hex(s));
        }

        let r = parse_hex_byte(&hex[0..2])?;
        let g = parse_hex_byte(&hex[2..4])?;
        let b = parse_hex_byte(&hex[4..6])?;
        Ok(Self::rgb(r, g, b))
    }

    /// Build a pixel from a 3- or 4-component integer tuple.
    ///
    /// A fourth (alpha) component is range-checked and then ignored.
    pub fn from_components(components: &[i64]) -> Result<Self> {
        if components.len() != 3 && components.len() != 4 {
            return Err(PmugError::Validation {
                message: format!(
                    "Pixel tuple has {} components, expected 3 (RGB) or 4 (RGBA)",
                    components.len()
                ),
                help: Some("Use [r, g, b] or [r, g, b, a]".to_string()),
            });
        }

        let mut channels = [0u8; 4];
        for (slot, &value) in channels.iter_mut().zip(components) {
            *slot = u8::try_from(value).map_err(|_| PmugError::Validation {
                message: format!("Pixel component {} is outside 0-255", value),
                help: None,
            })?;
        }

        Ok(Self::rgb(channels[0], channels[1], channels[2]))
    }

    /// Convert to an RGB triple.
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Format as upper-case `#RRGGBB`.
    pub fn to_hex(self) -> String {
        self.to_string()
    }

    /// Pack into a `0xRRGGBB` integer.
    pub fn to_decimal(self) -> u32 {
        rgb_to_decimal(self.r, self.g, self.b)
    }

    /// Component-wise floor average of a set of pixels.
    ///
    /// Returns black for an empty slice.
    pub fn average(pixels: &[Pixel]) -> Pixel {
        if pixels.is_empty() {
            return Pixel::BLACK;
        }

        let n = pixels.len() as u32;
        let (r, g, b) = pixels.iter().fold((0u32, 0u32, 0u32), |(r, g, b), p| {
            (r + p.r as u32, g + p.g as u32, b + p.b as u32)
        });

        Pixel::rgb((r / n) as u8, (g / n) as u8, (b / n) as u8)
    }
}

/// Pack RGB components into a single `0xRRGGBB` integer.
pub fn rgb_to_decimal(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

impl FromStr for Pixel {
    type Err = PmugError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl From<Rgb<u8>> for Pixel {
    fn from(rgb: Rgb<u8>) -> Self {
        Self::rgb(rgb.0[0], rgb.0[1], rgb.0[2])
    }
}

impl From<Pixel> for Rgb<u8> {
    fn from(pixel: Pixel) -> Self {
        Rgb(pixel.to_rgb())
    }
}

impl Serialize for Pixel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Pixel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pixel::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

fn invalid_hex(s: &str) -> PmugError {
    PmugError::Validation {
        message: format!("Invalid hex colour: {:?}", s),
        help: Some("Use #RRGGBB format, e.g. #FF8800".to_string()),
    }
}

/// Parse a two-character hex byte.
fn parse_hex_byte(s: &str) -> Result<u8> {
    u8::from_str_radix(s, 16).map_err(|_| PmugError::validation(format!("Invalid hex byte: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Pixel::from_hex("#FF0000").unwrap(), Pixel::rgb(255, 0, 0));
        assert_eq!(
            Pixel::from_hex("#1a1a2e").unwrap(),
            Pixel::rgb(0x1a, 0x1a, 0x2e)
        );
    }

    #[test]
    fn test_from_hex_rejects_other_forms() {
        assert!(Pixel::from_hex("FF0000").is_err());
        assert!(Pixel::from_hex("#F00").is_err());
        assert!(Pixel::from_hex("#FF000080").is_err());
        assert!(Pixel::from_hex("#GG0000").is_err());
        assert!(Pixel::from_hex("").is_err());
        assert!(Pixel::from_hex("#+F0000").is_err());
    }

    #[test]
    fn test_from_components() {
        assert_eq!(
            Pixel::from_components(&[1, 2, 3]).unwrap(),
            Pixel::rgb(1, 2, 3)
        );
        // Alpha is accepted and dropped
        assert_eq!(
            Pixel::from_components(&[1, 2, 3, 0]).unwrap(),
            Pixel::rgb(1, 2, 3)
        );
    }

    #[test]
    fn test_from_components_invalid() {
        assert!(Pixel::from_components(&[1, 2]).is_err());
        assert!(Pixel::from_components(&[1, 2, 3, 4, 5]).is_err());
        assert!(Pixel::from_components(&[256, 0, 0]).is_err());
        assert!(Pixel::from_components(&[0, -1, 0]).is_err());
        assert!(Pixel::from_components(&[0, 0, 0, 300]).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Pixel::rgb(255, 0, 0).to_string(), "#FF0000");
        assert_eq!(Pixel::rgb(0x0a, 0xbc, 0xde).to_hex(), "#0ABCDE");
    }

    #[test]
    fn test_average_floors() {
        let corners = [
            Pixel::rgb(255, 0, 0),
            Pixel::rgb(0, 255, 0),
            Pixel::rgb(0, 0, 255),
            Pixel::rgb(255, 255, 255),
        ];
        // (510 / 4, 510 / 4, 510 / 4) = 127.5 floored
        assert_eq!(Pixel::average(&corners), Pixel::rgb(127, 127, 127));
        assert_eq!(Pixel::average(&[]), Pixel::BLACK);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(rgb_to_decimal(0xff, 0, 0), 16711680);
        assert_eq!(Pixel::rgb(0, 0, 0xff).to_decimal(), 255);
    }

    #[test]
    fn test_serde_as_hex() {
        let json = serde_json::to_string(&Pixel::rgb(255, 136, 0)).unwrap();
        assert_eq!(json, "\"#FF8800\"");
        let back: Pixel = serde_json::from_str("\"#ff8800\"").unwrap();
        assert_eq!(back, Pixel::rgb(255, 136, 0));
        assert!(serde_json::from_str::<Pixel>("\"orange\"").is_err());
    }
}
