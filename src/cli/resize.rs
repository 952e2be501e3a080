//! Resize-gif command implementation.
//!
//! Fits every frame of an existing GIF onto the device canvas, keeping the
//! source frame delays and loop count.

use std::path::PathBuf;

use clap::Args;

use crate::config::PipelineConfig;
use crate::error::{PmugError, Result};
use crate::output::{display_path, format_bytes, plural, Printer};
use crate::render::{
    decode_source_gif, Animation, Assembled, Assembler, AssemblerOptions, Compositor, Frame,
    DEFAULT_FRAME_DELAY_MS,
};

/// Fit an animated GIF to the device canvas
#[derive(Args, Debug)]
pub struct ResizeGifArgs {
    /// GIF to resize (`-` for stdin)
    pub input: PathBuf,

    /// Output path
    #[arg(long, short)]
    pub output: PathBuf,
}

pub fn run(args: ResizeGifArgs, config: &PipelineConfig, printer: &Printer) -> Result<()> {
    let bytes = super::read_source(&args.input)?;
    let assembled = resize_gif(&bytes, config)?;

    std::fs::write(&args.output, &assembled.bytes).map_err(|e| PmugError::Io {
        path: args.output.clone(),
        message: format!("Failed to write GIF: {}", e),
    })?;

    for diagnostic in &assembled.diagnostics {
        printer.diagnostic(diagnostic);
    }
    printer.status(
        "Resized",
        &format!(
            "{} to {}x{}, {} ({})",
            display_path(&args.input),
            assembled.width,
            assembled.height,
            plural(assembled.frame_count, "frame", "frames"),
            format_bytes(assembled.bytes.len())
        ),
    );
    printer.status("Wrote", &printer.highlight(&display_path(&args.output)));

    Ok(())
}

/// Decode `bytes`, composite each frame onto the configured canvas and
/// re-encode.
pub fn resize_gif(bytes: &[u8], config: &PipelineConfig) -> Result<Assembled> {
    let source = decode_source_gif(bytes)?;
    let compositor = Compositor::new(config.canvas);

    let frames = source
        .frames
        .iter()
        .enumerate()
        .map(|(index, (image, delay_ms))| {
            let composed = compositor.composite_image(image)?;
            Ok(Frame::new(index, composed.to_matrix()?, Some(*delay_ms)))
        })
        .collect::<Result<Vec<_>>>()?;

    let assembler = Assembler::new(AssemblerOptions {
        palette_policy: config.palette_policy(),
        max_frames: config.max_frames,
        max_payload_bytes: config.max_payload_bytes,
    });
    assembler.assemble(&Animation::new(frames, source.loop_count, DEFAULT_FRAME_DELAY_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{inspect, LoopCount};
    use std::borrow::Cow;

    fn source_gif(repeat: Option<gif::Repeat>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let palette = [255, 0, 0, 0, 0, 255];
            let mut encoder = gif::Encoder::new(&mut buf, 4, 4, &palette).unwrap();
            if let Some(repeat) = repeat {
                encoder.set_repeat(repeat).unwrap();
            }
            for (i, delay) in [(0u8, 20u16), (1, 40)] {
                let frame = gif::Frame {
                    width: 4,
                    height: 4,
                    delay,
                    buffer: Cow::Owned(vec![i; 16]),
                    ..gif::Frame::default()
                };
                encoder.write_frame(&frame).unwrap();
            }
        }
        buf
    }

    #[test]
    fn test_resize_keeps_timing_and_loop() {
        let out = resize_gif(
            &source_gif(Some(gif::Repeat::Finite(3))),
            &PipelineConfig::default(),
        ).unwrap();
        assert_eq!((out.width, out.height), (32, 16));
        assert_eq!(out.frame_count, 2);

        let summary = inspect(&out.bytes).unwrap();
        assert_eq!(summary.delays_ms(), vec![200, 400]);
        assert_eq!(summary.loop_count, LoopCount::Finite(3));
        assert_eq!((summary.width, summary.height), (32, 16));

        // Solid frames fill the whole canvas with their own colour
        assert_eq!(&summary.frames[0].rgba[..3], &[255, 0, 0]);
        assert_eq!(&summary.frames[1].rgba[..3], &[0, 0, 255]);
    }

    #[test]
    fn test_resize_without_loop_extension_loops_forever() {
        let source = source_gif(None);
        assert_eq!(inspect(&source).unwrap().loop_count, LoopCount::Infinite);

        let out = resize_gif(&source, &PipelineConfig::default()).unwrap();
        assert_eq!(out.loop_count, LoopCount::Infinite);
        assert_eq!(inspect(&out.bytes).unwrap().loop_count, LoopCount::Infinite);
    }

    #[test]
    fn test_resize_rejects_non_gif() {
        assert!(resize_gif(b"not a gif", &PipelineConfig::default()).is_err());
    }
}
