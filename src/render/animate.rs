//! Animated GIF assembly.
//!
//! Frames are quantized according to a [`PalettePolicy`], encoded with an
//! explicit per-frame delay list, then decoded again to confirm that
//! distinct input frames survived encoding as distinct output frames.

use std::borrow::Cow;

use image::RgbImage;

use crate::diagnostics::Diagnostic;
use crate::error::{PmugError, Result};
use crate::types::PixelMatrix;

use super::inspect::{inspect, GifSummary, LoopCount};
use super::quantize::{quantize_per_frame, quantize_shared, IndexedFrame, PalettePolicy};

/// Default cap on frames per animation.
pub const DEFAULT_MAX_FRAMES: usize = 256;

/// Default cap on the encoded container size.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4 * 1024 * 1024;

/// One animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Sequence position.
    pub index: usize,
    pub matrix: PixelMatrix,
    /// Display time in milliseconds; `None` uses the animation's frame delay.
    pub duration_ms: Option<u32>,
}

impl Frame {
    pub fn new(index: usize, matrix: PixelMatrix, duration_ms: Option<u32>) -> Self {
        Self {
            index,
            matrix,
            duration_ms,
        }
    }
}

/// An ordered frame sequence with timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub frames: Vec<Frame>,
    pub loop_count: LoopCount,
    /// Delay applied to frames without their own duration.
    pub frame_delay_ms: u32,
}

impl Animation {
    pub fn new(frames: Vec<Frame>, loop_count: LoopCount, frame_delay_ms: u32) -> Self {
        Self {
            frames,
            loop_count,
            frame_delay_ms,
        }
    }

    /// The effective duration of every frame, in order.
    pub fn durations_ms(&self) -> Vec<u32> {
        self.frames
            .iter()
            .map(|f| f.duration_ms.unwrap_or(self.frame_delay_ms))
            .collect()
    }
}

/// Limits and policy for assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerOptions {
    pub palette_policy: PalettePolicy,
    pub max_frames: usize,
    pub max_payload_bytes: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            palette_policy: PalettePolicy::PerFrame,
            max_frames: DEFAULT_MAX_FRAMES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// An encoded animation.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    /// Per-frame delays as written to the container.
    pub durations_ms: Vec<u32>,
    pub loop_count: LoopCount,
    pub palette_policy: PalettePolicy,
    pub diagnostics: Vec<Diagnostic>,
}

/// Encodes [`Animation`]s as GIF89a.
#[derive(Debug, Clone, Copy, Default)]
pub struct Assembler {
    options: AssemblerOptions,
}

impl Assembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AssemblerOptions {
        &self.options
    }

    /// Encode an animation.
    pub fn assemble(&self, animation: &Animation) -> Result<Assembled> {
        let first = animation.frames.first().ok_or_else(|| PmugError::Encode {
            message: "Cannot assemble an animation with no frames".to_string(),
            help: Some("Provide at least one frame".to_string()),
        })?;

        if animation.frames.len() > self.options.max_frames {
            return Err(PmugError::Validation {
                message: format!(
                    "Animation has {} frames, maximum is {}",
                    animation.frames.len(),
                    self.options.max_frames
                ),
                help: None,
            });
        }

        let (width, height) = first.matrix.size();
        if let Some(odd) = animation.frames.iter().find(|f| f.matrix.size() != (width, height)) {
            return Err(PmugError::encode(format!(
                "Frame {} is {}x{} but frame 0 is {}x{}; all frames must share one size",
                odd.index,
                odd.matrix.width(),
                odd.matrix.height(),
                width,
                height
            )));
        }

        let durations_ms = animation.durations_ms();
        if let Some(pos) = durations_ms.iter().position(|&d| d == 0) {
            return Err(PmugError::validation(format!(
                "Frame {} has a zero duration",
                animation.frames[pos].index
            )));
        }

        let images: Vec<RgbImage> = animation.frames.iter().map(|f| f.matrix.to_image()).collect();

        let (global_palette, indexed) = match self.options.palette_policy {
            PalettePolicy::PerFrame => (Vec::new(), quantize_per_frame(&images)),
            PalettePolicy::Shared => quantize_shared(&images),
        };

        let bytes = encode_gif(
            width as u16,
            height as u16,
            &global_palette,
            &indexed,
            &durations_ms,
            animation.loop_count,
        )?;

        if bytes.len() > self.options.max_payload_bytes {
            return Err(PmugError::Encode {
                message: format!(
                    "Encoded animation is {} bytes, limit is {}",
                    bytes.len(),
                    self.options.max_payload_bytes
                ),
                help: Some("Use fewer frames".to_string()),
            });
        }

        let summary = inspect(&bytes)?;
        let diagnostics = verify_frames(&images, &summary);
        for diagnostic in &diagnostics {
            diagnostic.log();
        }

        tracing::info!(
            frames = images.len(),
            width,
            height,
            bytes = bytes.len(),
            loop_count = animation.loop_count.count(),
            policy = ?self.options.palette_policy,
            "assembled animation"
        );

        Ok(Assembled {
            bytes,
            width,
            height,
            frame_count: images.len(),
            durations_ms: durations_ms
                .iter()
                .map(|&ms| delay_centis(ms) as u32 * 10)
                .collect(),
            loop_count: animation.loop_count,
            palette_policy: self.options.palette_policy,
            diagnostics,
        })
    }
}

/// GIF delays are centiseconds; never write zero, which players treat as
/// "as fast as possible".
fn delay_centis(ms: u32) -> u16 {
    (ms / 10).clamp(1, u16::MAX as u32) as u16
}

fn encode_gif(
    width: u16,
    height: u16,
    global_palette: &[u8],
    frames: &[IndexedFrame],
    durations_ms: &[u32],
    loop_count: LoopCount,
) -> Result<Vec<u8>> {
    let encode_err = |e: gif::EncodingError| PmugError::encode(format!("GIF encoding failed: {}", e));

    let mut buffer = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut buffer, width, height, global_palette)
            .map_err(encode_err)?;
        encoder
            .set_repeat(loop_count.to_repeat())
            .map_err(encode_err)?;

        // One delay per frame, even when all are equal
        for (indexed, &ms) in frames.iter().zip(durations_ms) {
            let frame = gif::Frame {
                width,
                height,
                delay: delay_centis(ms),
                dispose: gif::DisposalMethod::Keep,
                palette: if indexed.palette.is_empty() {
                    None
                } else {
                    Some(indexed.palette.clone())
                },
                buffer: Cow::Borrowed(indexed.indices.as_slice()),
                ..gif::Frame::default()
            };
            encoder.write_frame(&frame).map_err(encode_err)?;
        }
    }

    Ok(buffer)
}

/// Compare decoded frames against the frames that were encoded.
fn verify_frames(inputs: &[RgbImage], summary: &GifSummary) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    // Number of runs of identical adjacent input frames: the fewest frames a
    // correct encoder may emit.
    let runs = 1 + inputs.windows(2).filter(|w| w[0] != w[1]).count();

    if summary.frames.len() != inputs.len() {
        if summary.frames.len() < runs {
            diagnostics.push(
                Diagnostic::warning(
                    "pmug::animate::frame-count",
                    format!(
                        "Encoded {} frames but decoded {} ({} distinct)",
                        inputs.len(),
                        summary.frames.len(),
                        runs
                    ),
                )
                .with_help("Distinct frames were merged by the encoder"),
            );
        }
        return diagnostics;
    }

    for (i, pair) in summary.frames.windows(2).enumerate() {
        if inputs[i] != inputs[i + 1] && pair[0].rgba == pair[1].rgba {
            diagnostics.push(
                Diagnostic::warning(
                    "pmug::animate::collapsed-frames",
                    format!(
                        "Frames {} and {} differ in the input but are identical after encoding",
                        i,
                        i + 1
                    ),
                )
                .with_help("Quantization merged their colours; try the shared palette policy"),
            );
        }
    }

    diagnostics
}
