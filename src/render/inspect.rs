//! GIF decoding: verifying assembled output and reading uploaded GIFs.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, RgbImage};
use serde::Serialize;

use crate::error::{PmugError, Result};

/// Delay assumed for source frames that declare none.
pub const DEFAULT_FRAME_DELAY_MS: u32 = 100;

/// How many times an animation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopCount {
    Infinite,
    Finite(u16),
}

impl LoopCount {
    /// Map the wire convention (`0` = forever) to a loop count.
    pub fn from_count(count: u16) -> Self {
        if count == 0 {
            LoopCount::Infinite
        } else {
            LoopCount::Finite(count)
        }
    }

    /// Back to the wire convention.
    pub fn count(self) -> u16 {
        match self {
            LoopCount::Infinite => 0,
            LoopCount::Finite(n) => n,
        }
    }

    pub(crate) fn to_repeat(self) -> gif::Repeat {
        match self {
            LoopCount::Infinite => gif::Repeat::Infinite,
            LoopCount::Finite(n) => gif::Repeat::Finite(n),
        }
    }
}

impl From<gif::Repeat> for LoopCount {
    fn from(repeat: gif::Repeat) -> Self {
        match repeat {
            // A missing loop extension decodes as `Finite(0)` and is
            // treated as looping forever.
            gif::Repeat::Infinite | gif::Repeat::Finite(0) => LoopCount::Infinite,
            gif::Repeat::Finite(n) => LoopCount::Finite(n),
        }
    }
}

/// One raw frame as stored in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub delay_ms: u32,
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    /// RGBA pixels of the frame rectangle.
    pub rgba: Vec<u8>,
}

/// Structure of an encoded GIF.
#[derive(Debug, Clone)]
pub struct GifSummary {
    pub width: u16,
    pub height: u16,
    pub loop_count: LoopCount,
    pub frames: Vec<DecodedFrame>,
}

impl GifSummary {
    /// Per-frame delays in milliseconds.
    pub fn delays_ms(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.delay_ms).collect()
    }
}

/// Decode a GIF frame by frame, without compositing.
///
/// Frames written by the assembler always cover the full canvas, so their
/// pixel buffers can be compared directly.
pub fn inspect(bytes: &[u8]) -> Result<GifSummary> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);

    let mut decoder = options
        .read_info(Cursor::new(bytes))
        .map_err(|e| PmugError::decode(format!("Invalid GIF: {}", e)))?;

    let (width, height) = (decoder.width(), decoder.height());
    let mut frames = Vec::new();
    while let Some(frame) = decoder
        .read_next_frame()
        .map_err(|e| PmugError::decode(format!("Invalid GIF frame: {}", e)))?
    {
        frames.push(DecodedFrame {
            delay_ms: frame.delay as u32 * 10,
            left: frame.left,
            top: frame.top,
            width: frame.width,
            height: frame.height,
            rgba: frame.buffer.to_vec(),
        });
    }

    Ok(GifSummary {
        width,
        height,
        loop_count: decoder.repeat().into(),
        frames,
    })
}

/// A GIF from an external source, fully composited into RGB frames.
#[derive(Debug, Clone)]
pub struct SourceAnimation {
    /// `(frame, delay_ms)` pairs.
    pub frames: Vec<(RgbImage, u32)>,
    pub loop_count: LoopCount,
}

/// Decode an uploaded GIF into composited RGB frames.
///
/// Zero delays are replaced with [`DEFAULT_FRAME_DELAY_MS`].
pub fn decode_source_gif(bytes: &[u8]) -> Result<SourceAnimation> {
    if bytes.is_empty() {
        return Err(PmugError::decode("Empty GIF data"));
    }

    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|e| PmugError::decode(format!("Invalid GIF: {}", e)))?;

    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| PmugError::decode(format!("Invalid GIF frame: {}", e)))?;

    if frames.is_empty() {
        return Err(PmugError::decode("No frames found in GIF"));
    }

    let frames = frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay_ms = if denom == 0 || numer == 0 {
                DEFAULT_FRAME_DELAY_MS
            } else {
                (numer / denom).max(1)
            };
            let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
            (rgb, delay_ms)
        })
        .collect();

    let loop_count = inspect(bytes)?.loop_count;

    Ok(SourceAnimation { frames, loop_count })
}
