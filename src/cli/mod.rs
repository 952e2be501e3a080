pub mod colours;
pub mod completions;
pub mod convert;
pub mod resize;
pub mod send;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::deliver::{DeliveryPipeline, OutboxDispatcher};
use crate::error::{PmugError, Result};
use crate::normalize::{AnimationInput, InputFormat};
use crate::package::FsStore;

/// pmug - Pixel art and GIF delivery for LED display devices
#[derive(Parser, Debug)]
#[command(name = "pmug")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./pmug.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Normalize an image and print its pixel matrix
    Convert(convert::ConvertArgs),

    /// Send a still image to a device
    SendImage(send::SendImageArgs),

    /// Send an animation to a device
    SendGif(send::SendGifArgs),

    /// Fit an animated GIF to the device canvas
    ResizeGif(resize::ResizeGifArgs),

    /// Generate a text and background colour pair
    Colours(colours::ColoursArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Read a file, or stdin when `path` is `-`.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }

    std::fs::read(path).map_err(|e| PmugError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to read input: {}", e),
    })
}

/// Interpret file contents as image input.
///
/// JSON documents are classified as pixel data (an `image_data` field is
/// unwrapped if present). Anything else is treated as an encoded image.
pub fn image_input(bytes: &[u8]) -> Result<InputFormat> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => InputFormat::from_value(unwrap_field(&value, "image_data")),
        Err(_) => Ok(InputFormat::Base64Raster(BASE64_STANDARD.encode(bytes))),
    }
}

/// Interpret file contents as animation input.
///
/// JSON documents are classified as frame data (a `gif_data` field is
/// unwrapped if present). Anything else is treated as an encoded GIF.
pub fn animation_input(bytes: &[u8]) -> Result<AnimationInput> {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => AnimationInput::from_value(unwrap_field(&value, "gif_data")),
        Err(_) => Ok(AnimationInput::EncodedGif(BASE64_STANDARD.encode(bytes))),
    }
}

fn unwrap_field<'a>(value: &'a Value, field: &str) -> &'a Value {
    value.get(field).unwrap_or(value)
}

/// Build a pipeline from configuration: a filesystem store when
/// `store.root` is set, and the JSON-lines outbox dispatcher.
pub fn build_pipeline(config: &PipelineConfig) -> Result<DeliveryPipeline> {
    let mut builder = DeliveryPipeline::builder(config.clone())
        .dispatcher(Arc::new(OutboxDispatcher::new(&config.outbox)));

    if let Some(root) = &config.store.root {
        let mut store = FsStore::new(root);
        if let Some(base) = &config.store.public_base_url {
            store = store.with_public_base_url(base);
        }
        if let Some(secret) = &config.store.signing_secret {
            store = store.with_signing_secret(secret);
        }
        builder = builder.store(Arc::new(store));
    }

    builder.build()
}
