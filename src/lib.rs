//! pmug - Pixel art and GIF delivery for LED display devices
//!
//! Normalizes pixel data from several input encodings, composites and
//! assembles animations for a fixed-size LED canvas, stores payloads under
//! content-addressed keys and dispatches fetch commands to devices.

pub mod cli;
pub mod colours;
pub mod config;
pub mod deliver;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod package;
pub mod render;
pub mod types;

pub use config::{LoggingConfig, PipelineConfig, RasterMode, StoreConfig};
pub use deliver::{
    AnimationRequest, ConversionReport, ConvertRequest, DeliveryCommand, DeliveryMethod,
    DeliveryPipeline, DeliveryReport, DeviceDispatcher, ImageRequest, OutboxDispatcher,
};
pub use diagnostics::{Diagnostic, Severity};
pub use error::{ErrorKind, PmugError, Result};
pub use normalize::{AnimationInput, InputFormat, Normalizer, RasterDecoder, ResampleMethod};
pub use package::{AssetDescriptor, FsStore, MemoryStore, ObjectStore, Packager};
pub use render::{Animation, Assembler, CanvasSize, Compositor, LoopCount, PalettePolicy};
pub use types::{Palette, Pixel, PixelMatrix};
