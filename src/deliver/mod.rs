//! Delivery orchestration.
//!
//! [`DeliveryPipeline`] runs normalize → (composite → assemble) → package →
//! dispatch for one request. Normalization and encoding errors are fatal.
//! Store failures degrade to direct transmission, where the payload travels
//! with the device command. Dispatch failures are fatal.

mod clock;
mod dispatch;
mod pipeline;
mod report;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatch::{
    correlation_id, port_for, DeliveryCommand, DeviceAction, DeviceDispatcher, DispatchReceipt,
    DispatchRequest, MemoryDispatcher, OutboxDispatcher, OutboxRecord, DIRECT_TRANSMISSION,
};
pub use pipeline::{pixel_payload, DeliveryPipeline, DeliveryPipelineBuilder};
pub use report::{
    AnimationInfo, AnimationRequest, AnimationSource, ConversionReport, ConvertRequest,
    DeliveryDetails, DeliveryMethod, DeliveryReport, ImageInfo, ImageRequest, Size,
};
