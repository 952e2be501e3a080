//! Send commands: deliver images and animations to a device.

use std::path::PathBuf;

use clap::Args;

use crate::config::PipelineConfig;
use crate::deliver::{
    AnimationRequest, DeliveryDetails, DeliveryMethod, DeliveryReport, ImageRequest,
};
use crate::error::Result;
use crate::normalize::ResampleMethod;
use crate::output::{display_path, format_bytes, plural, print_json, Printer};

/// Device addressing and delivery options shared by both send commands.
#[derive(Args, Debug)]
pub struct DeliveryArgs {
    /// Product identifier of the device
    #[arg(long)]
    pub product: String,

    /// Device name
    #[arg(long)]
    pub device: String,

    /// Base name for the stored asset
    #[arg(long)]
    pub name: Option<String>,

    /// Skip the object store and send the payload with the command
    #[arg(long)]
    pub no_store: bool,

    /// Lifetime of the retrieval URL in seconds
    #[arg(long)]
    pub ttl: Option<u64>,
}

/// Send a still image to a device
#[derive(Args, Debug)]
pub struct SendImageArgs {
    /// JSON pixel data or an image file (`-` for stdin)
    pub file: PathBuf,

    #[command(flatten)]
    pub delivery: DeliveryArgs,

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

/// Send an animation to a device
#[derive(Args, Debug)]
pub struct SendGifArgs {
    /// JSON frame data or a GIF file (`-` for stdin)
    pub file: PathBuf,

    #[command(flatten)]
    pub delivery: DeliveryArgs,

    /// Delay in milliseconds for frames without their own duration
    #[arg(long)]
    pub frame_delay: Option<u32>,

    /// Number of loops (0 = forever)
    #[arg(long)]
    pub loop_count: Option<u16>,
}

pub async fn run_image(
    args: SendImageArgs,
    config: &PipelineConfig,
    printer: &Printer,
) -> Result<()> {
    let bytes = super::read_source(&args.file)?;
    let image = super::image_input(&bytes)?;
    let pipeline = super::build_pipeline(config)?;

    let mut request = ImageRequest::new(&args.delivery.product, &args.delivery.device, image)
        .with_target(
            args.width.unwrap_or(config.default_target.width),
            args.height.unwrap_or(config.default_target.height),
        )
        .with_resample(args.method);
    if let Some(name) = &args.delivery.name {
        request = request.with_name(name);
    }
    if let Some(ttl) = args.delivery.ttl {
        request = request.with_ttl(ttl);
    }
    if args.delivery.no_store {
        request = request.with_use_store(false);
    }

    printer.status(
        "Sending",
        &format!("{} to {}", display_path(&args.file), args.delivery.device),
    );
    let report = pipeline.send_pixel_image(request).await?;
    summarize(&report, printer);
    print_json(&report)
}

pub async fn run_gif(args: SendGifArgs, config: &PipelineConfig, printer: &Printer) -> Result<()> {
    let bytes = super::read_source(&args.file)?;
    let animation = super::animation_input(&bytes)?;
    let pipeline = super::build_pipeline(config)?;

    let mut request =
        AnimationRequest::new(&args.delivery.product, &args.delivery.device, animation);
    if let Some(delay) = args.frame_delay {
        request = request.with_frame_delay(delay);
    }
    if let Some(loops) = args.loop_count {
        request = request.with_loop_count(loops);
    }
    if let Some(name) = &args.delivery.name {
        request = request.with_name(name);
    }
    if let Some(ttl) = args.delivery.ttl {
        request = request.with_ttl(ttl);
    }
    if args.delivery.no_store {
        request = request.with_use_store(false);
    }

    printer.status(
        "Sending",
        &format!("{} to {}", display_path(&args.file), args.delivery.device),
    );
    let report = pipeline.send_animation(request).await?;
    summarize(&report, printer);
    print_json(&report)
}

fn summarize(report: &DeliveryReport, printer: &Printer) {
    match &report.details {
        DeliveryDetails::Image(info) => printer.status(
            "Normalized",
            &format!(
                "{}x{} {} ({})",
                info.width,
                info.height,
                info.input_format,
                format_bytes(info.bytes)
            ),
        ),
        DeliveryDetails::Animation(info) => {
            printer.status(
                "Assembled",
                &format!(
                    "{} at {}x{} ({})",
                    plural(info.frame_count, "frame", "frames"),
                    info.width,
                    info.height,
                    format_bytes(info.bytes)
                ),
            );
            for diagnostic in &info.diagnostics {
                printer.diagnostic(diagnostic);
            }
        }
    }

    match (&report.delivery_method, &report.asset_info) {
        (DeliveryMethod::Store, Some(asset)) => {
            printer.status("Uploaded", &printer.highlight(&asset.url))
        }
        _ => printer.info("Direct", "payload sent with the command"),
    }
    printer.status(
        "Dispatched",
        &format!("{} {}", report.command.file_name, printer.muted(&report.correlation_id)),
    );
}
