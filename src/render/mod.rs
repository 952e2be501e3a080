//! Rendering for the device.
//!
//! Compositing frames onto the panel canvas, quantizing them to indexed
//! colour and assembling GIF animations.

mod animate;
mod compose;
mod inspect;
mod quantize;

pub use animate::{
    Animation, Assembled, Assembler, AssemblerOptions, Frame, DEFAULT_MAX_FRAMES,
    DEFAULT_MAX_PAYLOAD_BYTES,
};
pub use compose::{fill_colour, CanvasSize, Composition, Compositor, Placement, DEVICE_CANVAS};
pub use inspect::{
    decode_source_gif, inspect, DecodedFrame, GifSummary, LoopCount, SourceAnimation,
    DEFAULT_FRAME_DELAY_MS,
};
pub use quantize::{quantize_frame, quantize_per_frame, quantize_shared, IndexedFrame, PalettePolicy};
