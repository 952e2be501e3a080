//! Raster image decoding.
//!
//! Raster input arrives as base64 text. Decoding is behind the
//! [`RasterDecoder`] trait: [`CodecDecoder`] uses the `image` crate and is
//! the normal path, [`HashPatternDecoder`] is an explicit degraded mode that
//! never looks at the image format at all.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PmugError, Result};

/// Smallest payload the degraded decoder accepts.
const MIN_RASTER_BYTES: usize = 8;

/// Fixed allowance for container overhead (headers, metadata chunks).
const RASTER_OVERHEAD_BYTES: usize = 64 * 1024;

/// Resampling filter used when a raster does not match the target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Nearest neighbour; keeps pixel-art edges hard.
    #[default]
    Nearest,
    /// Bilinear (triangle) filter.
    Bilinear,
    /// Bicubic (Catmull-Rom) filter.
    Bicubic,
}

impl ResampleMethod {
    /// The `image` filter implementing this method.
    pub fn filter(self) -> FilterType {
        match self {
            ResampleMethod::Nearest => FilterType::Nearest,
            ResampleMethod::Bilinear => FilterType::Triangle,
            ResampleMethod::Bicubic => FilterType::CatmullRom,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResampleMethod::Nearest => "nearest",
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Bicubic => "bicubic",
        }
    }
}

impl FromStr for ResampleMethod {
    type Err = PmugError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Ok(ResampleMethod::Nearest),
            "bilinear" => Ok(ResampleMethod::Bilinear),
            "bicubic" => Ok(ResampleMethod::Bicubic),
            other => Err(PmugError::Decode {
                message: format!("Unsupported resample method: {:?}", other),
                help: Some("Use one of: nearest, bilinear, bicubic".to_string()),
            }),
        }
    }
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raster decoded and resampled to the requested size.
#[derive(Debug, Clone)]
pub struct DecodedRaster {
    pub image: RgbImage,
    /// Size of the source image before resampling.
    pub original_size: (u32, u32),
}

/// Capability to turn raw raster bytes into an RGB image of a given size.
pub trait RasterDecoder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Decode `bytes` and resample to exactly `width × height`.
    fn decode(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        method: ResampleMethod,
    ) -> Result<DecodedRaster>;
}

/// Decoder backed by the `image` crate codecs (PNG, JPEG, GIF, BMP, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct CodecDecoder;

impl RasterDecoder for CodecDecoder {
    fn name(&self) -> &'static str {
        "codec"
    }

    fn decode(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        method: ResampleMethod,
    ) -> Result<DecodedRaster> {
        let decoded = image::load_from_memory(bytes).map_err(|e| PmugError::Decode {
            message: format!("Could not decode raster image: {}", e),
            help: Some("Supported formats include PNG and JPEG".to_string()),
        })?;

        let rgb = decoded.to_rgb8();
        let original_size = rgb.dimensions();

        let image = if original_size == (width, height) {
            rgb
        } else {
            imageops::resize(&rgb, width, height, method.filter())
        };

        Ok(DecodedRaster {
            image,
            original_size,
        })
    }
}

/// Degraded-mode decoder that derives a pattern from the payload hash.
///
/// The output depends only on `sha256(bytes)` and the target size, so the
/// same upload always renders the same pattern. It does not decode the
/// image; it exists for deployments built without raster codecs and must be
/// selected explicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPatternDecoder;

impl HashPatternDecoder {
    /// Largest payload considered plausible for a `width × height` target.
    pub fn max_plausible_bytes(width: u32, height: u32) -> usize {
        64 * 4 * (width as usize) * (height as usize) + RASTER_OVERHEAD_BYTES
    }
}

impl RasterDecoder for HashPatternDecoder {
    fn name(&self) -> &'static str {
        "hash-pattern"
    }

    fn decode(
        &self,
        bytes: &[u8],
        width: u32,
        height: u32,
        _method: ResampleMethod,
    ) -> Result<DecodedRaster> {
        let max = Self::max_plausible_bytes(width, height);
        if bytes.len() < MIN_RASTER_BYTES || bytes.len() > max {
            return Err(PmugError::Decode {
                message: format!(
                    "Raster payload of {} bytes is implausible for a {}x{} image",
                    bytes.len(),
                    width,
                    height
                ),
                help: Some(format!(
                    "Expected between {} and {} bytes",
                    MIN_RASTER_BYTES, max
                )),
            });
        }

        let seed = Sha256::digest(bytes);
        let needed = (width * height * 3) as usize;
        let mut stream = Vec::with_capacity(needed + 32);
        let mut block: u32 = 0;
        while stream.len() < needed {
            let mut hasher = Sha256::new();
            hasher.update(seed);
            hasher.update(block.to_le_bytes());
            stream.extend_from_slice(&hasher.finalize());
            block += 1;
        }

        let image = RgbImage::from_fn(width, height, |x, y| {
            let i = ((y * width + x) * 3) as usize;
            image::Rgb([stream[i], stream[i + 1], stream[i + 2]])
        });

        Ok(DecodedRaster {
            image,
            original_size: (width, height),
        })
    }
}

/// Reject base64 text longer than `max_chars`.
pub fn check_raster_text(text: &str, max_chars: usize) -> Result<()> {
    if text.len() > max_chars {
        return Err(PmugError::Validation {
            message: format!(
                "Raster payload of {} base64 characters exceeds the limit of {}",
                text.len(),
                max_chars
            ),
            help: Some("Raise max_raster_bytes or send a smaller image".to_string()),
        });
    }
    Ok(())
}

/// Decode base64 raster text, accepting an optional `data:` URL prefix and
/// embedded whitespace.
pub fn decode_base64_payload(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let body = match text.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| PmugError::decode("Malformed data URL: missing ',' separator"))?,
        None => text,
    };

    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(PmugError::decode("Raster payload is empty"));
    }

    BASE64_STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PmugError::Decode {
            message: format!("Invalid base64 raster payload: {}", e),
            help: Some("Send the image bytes as standard base64".to_string()),
        })
}
