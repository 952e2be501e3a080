//! Convert command implementation.

use std::path::PathBuf;

use clap::Args;

use crate::config::PipelineConfig;
use crate::deliver::ConvertRequest;
use crate::error::Result;
use crate::normalize::ResampleMethod;
use crate::output::{display_path, print_json, Printer};

/// Normalize an image and print its pixel matrix
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// JSON pixel data or an image file (`-` for stdin)
    pub file: PathBuf,

    /// Target width (defaults to the configured target)
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height (defaults to the configured target)
    #[arg(long)]
    pub height: Option<u32>,

    /// Resampling for image files: nearest, bilinear or bicubic
    #[arg(long, default_value = "nearest")]
    pub method: ResampleMethod,
}

pub fn run(args: ConvertArgs, config: &PipelineConfig, printer: &Printer) -> Result<()> {
    let bytes = super::read_source(&args.file)?;
    let image = super::image_input(&bytes)?;

    let pipeline = super::build_pipeline(config)?;
    let request = ConvertRequest::new(image)
        .with_target(
            args.width.unwrap_or(config.default_target.width),
            args.height.unwrap_or(config.default_target.height),
        )
        .with_resample(args.method);
    let report = pipeline.convert_image_to_pixels(request)?;

    printer.status(
        "Converted",
        &format!(
            "{} to {}x{} ({})",
            display_path(&args.file),
            report.width,
            report.height,
            report.input_format
        ),
    );
    print_json(&report)
}
