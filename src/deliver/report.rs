//! Request and result types for the delivery pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::normalize::{AnimationInput, InputFormat, ResampleMethod};
use crate::package::AssetDescriptor;
use crate::render::{CanvasSize, PalettePolicy};
use crate::types::PixelMatrix;

use super::dispatch::DeliveryCommand;

/// Send one still image to a device.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub product_id: String,
    pub device_name: String,
    pub image: InputFormat,
    /// Normalization size; the configured default target when `None`.
    pub target: Option<CanvasSize>,
    pub resample: ResampleMethod,
    /// Base name of the stored asset.
    pub name: Option<String>,
    /// Override the configured `use_store`.
    pub use_store: Option<bool>,
    /// Override the configured URL lifetime.
    pub ttl_seconds: Option<u64>,
}

impl ImageRequest {
    pub fn new(
        product_id: impl Into<String>,
        device_name: impl Into<String>,
        image: InputFormat,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            device_name: device_name.into(),
            image,
            target: None,
            resample: ResampleMethod::Nearest,
            name: None,
            use_store: None,
            ttl_seconds: None,
        }
    }

    pub fn with_target(mut self, width: u32, height: u32) -> Self {
        self.target = Some(CanvasSize::new(width, height));
        self
    }

    pub fn with_resample(mut self, resample: ResampleMethod) -> Self {
        self.resample = resample;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_use_store(mut self, use_store: bool) -> Self {
        self.use_store = Some(use_store);
        self
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }
}

/// Send an animation to a device.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationRequest {
    pub product_id: String,
    pub device_name: String,
    pub animation: AnimationInput,
    /// Delay for frames without their own duration. Takes precedence over a
    /// `frame_delay` inside the animation data.
    pub frame_delay_ms: Option<u32>,
    /// `0` loops forever. Takes precedence over the animation data and the
    /// loop count of an uploaded GIF.
    pub loop_count: Option<u16>,
    pub name: Option<String>,
    pub use_store: Option<bool>,
    pub ttl_seconds: Option<u64>,
}

impl AnimationRequest {
    pub fn new(
        product_id: impl Into<String>,
        device_name: impl Into<String>,
        animation: AnimationInput,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            device_name: device_name.into(),
            animation,
            frame_delay_ms: None,
            loop_count: None,
            name: None,
            use_store: None,
            ttl_seconds: None,
        }
    }

    pub fn with_frame_delay(mut self, frame_delay_ms: u32) -> Self {
        self.frame_delay_ms = Some(frame_delay_ms);
        self
    }

    pub fn with_loop_count(mut self, loop_count: u16) -> Self {
        self.loop_count = Some(loop_count);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_use_store(mut self, use_store: bool) -> Self {
        self.use_store = Some(use_store);
        self
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }
}

/// Normalize an image without sending it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest {
    pub image: InputFormat,
    pub target: Option<CanvasSize>,
    pub resample: ResampleMethod,
}

impl ConvertRequest {
    pub fn new(image: InputFormat) -> Self {
        Self {
            image,
            target: None,
            resample: ResampleMethod::Nearest,
        }
    }

    pub fn with_target(mut self, width: u32, height: u32) -> Self {
        self.target = Some(CanvasSize::new(width, height));
        self
    }

    pub fn with_resample(mut self, resample: ResampleMethod) -> Self {
        self.resample = resample;
        self
    }
}

/// Width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// How the payload reached the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    /// The device fetches the asset from the object store.
    Store,
    /// The payload travels with the command.
    Direct,
}

/// Where an animation's frames came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationSource {
    Frames,
    Gif,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub total_pixels: usize,
    pub input_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<Size>,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
    pub durations_ms: Vec<u32>,
    pub total_duration_ms: u64,
    /// `0` loops forever.
    pub loop_count: u16,
    pub palette_policy: PalettePolicy,
    pub source: AnimationSource,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Stage-specific details of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DeliveryDetails {
    #[serde(rename = "imageInfo")]
    Image(ImageInfo),
    #[serde(rename = "animationInfo")]
    Animation(AnimationInfo),
}

/// Result of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// Always `"success"`; failures are returned as errors.
    pub status: &'static str,
    pub delivery_method: DeliveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_info: Option<AssetDescriptor>,
    #[serde(flatten)]
    pub details: DeliveryDetails,
    pub command: DeliveryCommand,
    pub product_id: String,
    pub device_name: String,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of `convert_image_to_pixels`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub pixel_matrix: PixelMatrix,
    pub width: u32,
    pub height: u32,
    pub total_pixels: usize,
    pub input_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_size: Option<Size>,
    pub resize_method: ResampleMethod,
}
