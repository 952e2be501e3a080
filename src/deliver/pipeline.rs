use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{PipelineConfig, RasterMode, MAX_TTL_SECONDS};
use crate::error::{PmugError, Result};
use crate::normalize::{
    check_raster_text, decode_base64_payload, AnimationInput, CodecDecoder, FrameInput,
    HashPatternDecoder, NormalizeOptions, Normalizer, RasterDecoder,
};
use crate::package::{
    asset_file_name, content_hash, short_hash, AssetDescriptor, AssetInfo, AssetKind,
    ObjectStore, Packager,
};
use crate::render::{
    decode_source_gif, Animation, Assembled, Assembler, AssemblerOptions, Compositor, Frame,
    LoopCount, DEFAULT_FRAME_DELAY_MS,
};
use crate::types::PixelMatrix;

use super::clock::{Clock, SystemClock};
use super::dispatch::{DeliveryCommand, DeviceAction, DeviceDispatcher, DispatchReceipt, DispatchRequest};
use super::report::{
    AnimationInfo, AnimationRequest, AnimationSource, ConversionReport, ConvertRequest,
    DeliveryDetails, DeliveryMethod, DeliveryReport, ImageInfo, ImageRequest, Size,
};

/// Name used for assets when the request gives none.
const DEFAULT_IMAGE_NAME: &str = "image";
const DEFAULT_ANIMATION_NAME: &str = "animation";

/// JSON body sent to devices for still images.
#[derive(Serialize)]
struct PixelPayload<'a> {
    width: u32,
    height: u32,
    pixels: &'a PixelMatrix,
}

/// Serialize a matrix as the device's JSON pixel format.
pub fn pixel_payload(matrix: &PixelMatrix) -> Result<Vec<u8>> {
    serde_json::to_vec(&PixelPayload {
        width: matrix.width(),
        height: matrix.height(),
        pixels: matrix,
    })
    .map_err(|e| PmugError::encode(format!("Failed to serialize pixel payload: {}", e)))
}

/// Normalizes, packages and dispatches payloads to devices.
///
/// Holds no mutable state; one pipeline can serve concurrent requests.
pub struct DeliveryPipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    compositor: Compositor,
    assembler: Assembler,
    packager: Option<Packager>,
    dispatcher: Arc<dyn DeviceDispatcher>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for DeliveryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryPipeline")
            .field("decoder", &self.normalizer.decoder_name())
            .field("packager", &self.packager)
            .field("dispatcher", &self.dispatcher.name())
            .finish()
    }
}

/// Builder for [`DeliveryPipeline`].
pub struct DeliveryPipelineBuilder {
    config: PipelineConfig,
    decoder: Option<Box<dyn RasterDecoder>>,
    store: Option<Arc<dyn ObjectStore>>,
    dispatcher: Option<Arc<dyn DeviceDispatcher>>,
    clock: Option<Arc<dyn Clock>>,
}

impl DeliveryPipelineBuilder {
    /// Override the raster decoder chosen by `raster_mode`.
    pub fn decoder(mut self, decoder: Box<dyn RasterDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Object store for packaged assets. Without one, every delivery is direct.
    pub fn store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn dispatcher(mut self, dispatcher: Arc<dyn DeviceDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<DeliveryPipeline> {
        self.config.validate()?;

        let dispatcher = self.dispatcher.ok_or_else(|| PmugError::Config {
            message: "No device dispatcher configured".to_string(),
            help: Some("Call .dispatcher(...) before .build()".to_string()),
        })?;

        let decoder: Box<dyn RasterDecoder> = match self.decoder {
            Some(decoder) => decoder,
            None => match self.config.raster_mode {
                RasterMode::Codec => Box::new(CodecDecoder),
                RasterMode::HashPattern => Box::new(HashPatternDecoder),
            },
        };
        if self.config.raster_mode == RasterMode::HashPattern {
            tracing::warn!("raster images will be replaced by hash-derived patterns");
        }

        let assembler = Assembler::new(AssemblerOptions {
            palette_policy: self.config.palette_policy(),
            max_frames: self.config.max_frames,
            max_payload_bytes: self.config.max_payload_bytes,
        });

        Ok(DeliveryPipeline {
            normalizer: Normalizer::new(decoder).with_max_raster_bytes(self.config.max_raster_bytes),
            compositor: Compositor::new(self.config.canvas),
            assembler,
            packager: self
                .store
                .map(|store| Packager::new(self.config.namespace.clone(), store)),
            dispatcher,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: self.config,
        })
    }
}

impl DeliveryPipeline {
    pub fn builder(config: PipelineConfig) -> DeliveryPipelineBuilder {
        DeliveryPipelineBuilder {
            config,
            decoder: None,
            store: None,
            dispatcher: None,
            clock: None,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize an image and deliver it as a JSON pixel payload.
    pub async fn send_pixel_image(&self, request: ImageRequest) -> Result<DeliveryReport> {
        check_addressing(&request.product_id, &request.device_name)?;
        let ttl_seconds = self.ttl(request.ttl_seconds)?;

        let target = request.target.unwrap_or(self.config.default_target);
        let options = NormalizeOptions::new(target.width, target.height)
            .with_resample(request.resample);
        let normalized = self.normalizer.normalize(&request.image, &options)?;
        let matrix = &normalized.matrix;
        let payload = pixel_payload(matrix)?;

        tracing::info!(
            device = %request.device_name,
            format = request.image.name(),
            width = matrix.width(),
            height = matrix.height(),
            bytes = payload.len(),
            "normalized image"
        );

        let name = request.name.as_deref().unwrap_or(DEFAULT_IMAGE_NAME);
        let info = AssetInfo {
            kind: AssetKind::Json,
            name,
            device_name: &request.device_name,
            product_id: &request.product_id,
            width: matrix.width(),
            height: matrix.height(),
            frames: 1,
        };
        let use_store = request.use_store.unwrap_or(self.config.use_store);

        let details = DeliveryDetails::Image(ImageInfo {
            width: matrix.width(),
            height: matrix.height(),
            total_pixels: matrix.pixel_count(),
            input_format: request.image.name().to_string(),
            original_size: normalized.original_size.map(Size::from),
            bytes: payload.len(),
        });

        self.deliver(
            payload,
            &info,
            DeviceAction::SendPixelImage,
            use_store,
            ttl_seconds,
            details,
        )
        .await
    }

    /// Composite, assemble and deliver an animation.
    pub async fn send_animation(&self, request: AnimationRequest) -> Result<DeliveryReport> {
        check_addressing(&request.product_id, &request.device_name)?;
        let ttl_seconds = self.ttl(request.ttl_seconds)?;

        let (animation, source) = match &request.animation {
            AnimationInput::Frames {
                frames,
                frame_delay_ms,
                loop_count,
            } => {
                let frame_delay_ms = match request.frame_delay_ms {
                    Some(ms) => positive_ms(ms as i64, "frame_delay")?,
                    None => frame_delay_ms
                        .map(|ms| positive_ms(ms, "frame_delay"))
                        .transpose()?
                        .unwrap_or(DEFAULT_FRAME_DELAY_MS),
                };
                let loop_count = match request.loop_count {
                    Some(n) => n,
                    None => loop_count.map(to_loop_count).transpose()?.unwrap_or(0),
                };
                let frames = self.composite_frames(frames)?;
                (
                    Animation::new(frames, LoopCount::from_count(loop_count), frame_delay_ms),
                    AnimationSource::Frames,
                )
            }
            AnimationInput::EncodedGif(text) => {
                let animation = self.composite_gif(text)?;
                let animation = match request.loop_count {
                    Some(n) => Animation {
                        loop_count: LoopCount::from_count(n),
                        ..animation
                    },
                    None => animation,
                };
                (animation, AnimationSource::Gif)
            }
        };

        let assembled = self.assembler.assemble(&animation)?;

        let name = request.name.as_deref().unwrap_or(DEFAULT_ANIMATION_NAME);
        let info = AssetInfo {
            kind: AssetKind::Gif,
            name,
            device_name: &request.device_name,
            product_id: &request.product_id,
            width: assembled.width,
            height: assembled.height,
            frames: assembled.frame_count,
        };
        let use_store = request.use_store.unwrap_or(self.config.use_store);
        let details = DeliveryDetails::Animation(animation_info(&assembled, source));

        self.deliver(
            assembled.bytes,
            &info,
            DeviceAction::SendGifAnimation,
            use_store,
            ttl_seconds,
            details,
        )
        .await
    }

    /// Normalize an image and report the result without delivering it.
    pub fn convert_image_to_pixels(&self, request: ConvertRequest) -> Result<ConversionReport> {
        let target = request.target.unwrap_or(self.config.default_target);
        let options = NormalizeOptions::new(target.width, target.height)
            .with_resample(request.resample);
        let normalized = self.normalizer.normalize(&request.image, &options)?;

        let (width, height) = normalized.matrix.size();
        Ok(ConversionReport {
            width,
            height,
            total_pixels: normalized.matrix.pixel_count(),
            input_format: request.image.name().to_string(),
            original_size: normalized.original_size.map(Size::from),
            resize_method: request.resample,
            pixel_matrix: normalized.matrix,
        })
    }

    /// Normalize each frame at its own grid size and composite it onto the
    /// canvas. Raster frames are decoded at the canvas size.
    fn composite_frames(&self, inputs: &[FrameInput]) -> Result<Vec<Frame>> {
        if inputs.len() > self.config.max_frames {
            return Err(PmugError::validation(format!(
                "Animation has {} frames, maximum is {}",
                inputs.len(),
                self.config.max_frames
            )));
        }

        let ordered = order_frames(inputs)?;
        let canvas = self.compositor.canvas();

        ordered
            .into_iter()
            .enumerate()
            .map(|(position, input)| {
                let (width, height) = input
                    .pixels
                    .grid_size()
                    .unwrap_or((canvas.width, canvas.height));
                let normalized = self
                    .normalizer
                    .normalize(&input.pixels, &NormalizeOptions::new(width, height))
                    .map_err(|e| frame_error(position, e))?;
                let composed = self.compositor.composite(&normalized.matrix)?;
                let duration_ms = input
                    .duration_ms
                    .map(|ms| positive_ms(ms, "duration"))
                    .transpose()
                    .map_err(|e| frame_error(position, e))?;
                Ok(Frame::new(position, composed.to_matrix()?, duration_ms))
            })
            .collect()
    }

    /// Decode an uploaded GIF and composite every frame onto the canvas,
    /// keeping its delays and loop count.
    fn composite_gif(&self, text: &str) -> Result<Animation> {
        check_raster_text(text, self.config.max_raster_bytes)?;
        let bytes = decode_base64_payload(text)?;
        let source = decode_source_gif(&bytes)?;

        if source.frames.len() > self.config.max_frames {
            return Err(PmugError::validation(format!(
                "GIF has {} frames, maximum is {}",
                source.frames.len(),
                self.config.max_frames
            )));
        }

        let frames = source
            .frames
            .iter()
            .enumerate()
            .map(|(index, (image, delay_ms))| {
                let composed = self.compositor.composite_image(image)?;
                Ok(Frame::new(index, composed.to_matrix()?, Some(*delay_ms)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Animation::new(frames, source.loop_count, DEFAULT_FRAME_DELAY_MS))
    }

    /// Package (best effort), build the command and dispatch it.
    async fn deliver(
        &self,
        payload: Vec<u8>,
        info: &AssetInfo<'_>,
        action: DeviceAction,
        use_store: bool,
        ttl_seconds: u64,
        details: DeliveryDetails,
    ) -> Result<DeliveryReport> {
        let now = self.clock.now();

        let asset = if use_store {
            self.try_package(&payload, info, ttl_seconds).await
        } else {
            None
        };

        let (delivery_method, command, direct_payload) = match &asset {
            Some(asset) => (
                DeliveryMethod::Store,
                DeliveryCommand::fetch(asset.file_name.clone(), asset.bytes, asset.url.clone()),
                None,
            ),
            None => {
                let sha256 = content_hash(&payload);
                let file_name = asset_file_name(info.name, short_hash(&sha256), info.kind);
                (
                    DeliveryMethod::Direct,
                    DeliveryCommand::direct(file_name, payload.len()),
                    Some(payload),
                )
            }
        };

        let receipt = self
            .dispatch(DispatchRequest {
                product_id: info.product_id.to_string(),
                device_name: info.device_name.to_string(),
                action,
                command: command.clone(),
                payload: direct_payload,
            })
            .await?;

        tracing::info!(
            device = %info.device_name,
            method = ?delivery_method,
            correlation_id = %receipt.correlation_id,
            "dispatched {}",
            command.file_name
        );

        Ok(DeliveryReport {
            status: "success",
            delivery_method,
            asset_info: asset,
            details,
            command,
            product_id: info.product_id.to_string(),
            device_name: info.device_name.to_string(),
            correlation_id: receipt.correlation_id,
            timestamp: now,
        })
    }

    /// Upload through the packager, or `None` if there is no store or the
    /// upload fails or times out.
    async fn try_package(
        &self,
        payload: &[u8],
        info: &AssetInfo<'_>,
        ttl_seconds: u64,
    ) -> Option<AssetDescriptor> {
        let packager = self.packager.as_ref()?;
        let limit = Duration::from_millis(self.config.upload_timeout_ms);

        let result = tokio::time::timeout(
            limit,
            packager.package(payload, info, self.clock.now(), ttl_seconds),
        )
        .await
        .unwrap_or_else(|_| {
            Err(PmugError::store(format!(
                "Upload timed out after {} ms",
                self.config.upload_timeout_ms
            )))
        });

        match result {
            Ok(asset) => Some(asset),
            Err(e) => {
                tracing::warn!(
                    device = %info.device_name,
                    error = %e,
                    "store upload failed, falling back to direct transmission"
                );
                None
            }
        }
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReceipt> {
        let limit = Duration::from_millis(self.config.dispatch_timeout_ms);
        tokio::time::timeout(limit, self.dispatcher.dispatch(request))
            .await
            .unwrap_or_else(|_| {
                Err(PmugError::Dispatch {
                    message: format!(
                        "Dispatch timed out after {} ms",
                        self.config.dispatch_timeout_ms
                    ),
                    help: Some("Check that the device bridge is reachable".to_string()),
                })
            })
    }

    fn ttl(&self, requested: Option<u64>) -> Result<u64> {
        let ttl = requested.unwrap_or(self.config.ttl_seconds);
        if ttl == 0 || ttl > MAX_TTL_SECONDS {
            return Err(PmugError::Validation {
                message: format!("TTL of {}s is out of range", ttl),
                help: Some(format!("Use a value between 1 and {}", MAX_TTL_SECONDS)),
            });
        }
        Ok(ttl)
    }
}

fn animation_info(assembled: &Assembled, source: AnimationSource) -> AnimationInfo {
    AnimationInfo {
        width: assembled.width,
        height: assembled.height,
        frame_count: assembled.frame_count,
        total_duration_ms: assembled.durations_ms.iter().map(|&d| d as u64).sum(),
        durations_ms: assembled.durations_ms.clone(),
        loop_count: assembled.loop_count.count(),
        palette_policy: assembled.palette_policy,
        source,
        bytes: assembled.bytes.len(),
        diagnostics: assembled.diagnostics.clone(),
    }
}

fn check_addressing(product_id: &str, device_name: &str) -> Result<()> {
    if product_id.trim().is_empty() {
        return Err(PmugError::validation("product_id must not be empty"));
    }
    if device_name.trim().is_empty() {
        return Err(PmugError::validation("device_name must not be empty"));
    }
    if device_name.contains('/') {
        return Err(PmugError::validation(format!(
            "device_name {:?} must not contain '/'",
            device_name
        )));
    }
    Ok(())
}

/// Frames in caller order, or by `frame_index` when every frame has one.
fn order_frames(inputs: &[FrameInput]) -> Result<Vec<&FrameInput>> {
    let mut ordered: Vec<&FrameInput> = inputs.iter().collect();
    if !inputs.is_empty() && inputs.iter().all(|f| f.index.is_some()) {
        ordered.sort_by_key(|f| f.index);
        if let Some(pair) = ordered.windows(2).find(|w| w[0].index == w[1].index) {
            return Err(PmugError::validation(format!(
                "Duplicate frame_index {}",
                pair[0].index.unwrap_or_default()
            )));
        }
    }
    Ok(ordered)
}

fn positive_ms(ms: i64, field: &str) -> Result<u32> {
    u32::try_from(ms)
        .ok()
        .filter(|&ms| ms > 0)
        .ok_or_else(|| PmugError::validation(format!("{} must be a positive number of milliseconds, got {}", field, ms)))
}

fn to_loop_count(count: i64) -> Result<u16> {
    u16::try_from(count).map_err(|_| {
        PmugError::validation(format!("loop_count must be between 0 and 65535, got {}", count))
    })
}

fn frame_error(position: usize, error: PmugError) -> PmugError {
    match error {
        PmugError::Validation { message, help } => PmugError::Validation {
            message: format!("Frame {}: {}", position, message),
            help,
        },
        PmugError::Decode { message, help } => PmugError::Decode {
            message: format!("Frame {}: {}", position, message),
            help,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deliver::clock::FixedClock;
    use crate::deliver::dispatch::{MemoryDispatcher, DIRECT_TRANSMISSION};
    use crate::error::ErrorKind;
    use crate::normalize::InputFormat;
    use crate::package::{MemoryStore, PutObject};
    use crate::render::inspect;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct FailingStore;

    #[async_trait::async_trait]
    impl ObjectStore for FailingStore {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn put(&self, _object: PutObject) -> Result<()> {
            Err(PmugError::store("bucket unavailable"))
        }

        async fn retrieval_url(&self, _key: &str, _expires_at: DateTime<Utc>) -> Result<String> {
            Err(PmugError::store("bucket unavailable"))
        }
    }

    struct SlowStore;

    #[async_trait::async_trait]
    impl ObjectStore for SlowStore {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn put(&self, _object: PutObject) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn retrieval_url(&self, key: &str, _expires_at: DateTime<Utc>) -> Result<String> {
            Ok(format!("https://slow/{}", key))
        }
    }

    struct SlowDispatcher;

    #[async_trait::async_trait]
    impl DeviceDispatcher for SlowDispatcher {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn dispatch(&self, _request: DispatchRequest) -> Result<DispatchReceipt> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(DispatchReceipt {
                correlation_id: "late".to_string(),
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap()
    }

    fn build_pipeline(
        store: Option<Arc<dyn ObjectStore>>,
        dispatcher: Arc<dyn DeviceDispatcher>,
        config: PipelineConfig,
    ) -> DeliveryPipeline {
        let mut builder = DeliveryPipeline::builder(config)
            .dispatcher(dispatcher)
            .clock(Arc::new(FixedClock(now())));
        if let Some(store) = store {
            builder = builder.store(store);
        }
        builder.build().unwrap()
    }

    fn scenario_a_image() -> InputFormat {
        InputFormat::from_value(&json!([["#FF0000", "#00FF00"], ["#0000FF", "#FFFFFF"]])).unwrap()
    }

    #[tokio::test]
    async fn test_send_image_through_store() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let pipeline = build_pipeline(Some(store.clone()), dispatcher.clone(), PipelineConfig::default());

        let request = ImageRequest::new("P1", "lamp", scenario_a_image())
            .with_target(2, 2)
            .with_name("tile");
        let report = pipeline.send_pixel_image(request).await.unwrap();

        assert_eq!(report.status, "success");
        assert_eq!(report.delivery_method, DeliveryMethod::Store);
        let asset = report.asset_info.as_ref().unwrap();
        assert!(asset.key.starts_with("pmug/lamp/202406/tile-"));
        assert_eq!(asset.expires_at, now().timestamp() + 900);
        assert_eq!(report.command.url, asset.url);
        assert_eq!(report.command.port, 80);

        let stored = store.get(&asset.key).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(
            body,
            json!({
                "width": 2,
                "height": 2,
                "pixels": [["#FF0000", "#00FF00"], ["#0000FF", "#FFFFFF"]]
            })
        );

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload, None);
        assert_eq!(sent[0].action, DeviceAction::SendPixelImage);
    }

    #[tokio::test]
    async fn test_store_failure_falls_back_to_direct() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let pipeline = build_pipeline(Some(Arc::new(FailingStore)), dispatcher.clone(), PipelineConfig::default());

        let request = ImageRequest::new("P1", "lamp", scenario_a_image()).with_target(2, 2);
        let report = pipeline.send_pixel_image(request).await.unwrap();

        assert_eq!(report.status, "success");
        assert_eq!(report.delivery_method, DeliveryMethod::Direct);
        assert!(report.asset_info.is_none());
        assert_eq!(report.command.url, DIRECT_TRANSMISSION);
        assert_eq!(report.command.port, 80);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["deliveryMethod"], "direct");
        assert!(json.get("assetInfo").is_none());
        assert_eq!(json["imageInfo"]["totalPixels"], 4);

        let sent = dispatcher.sent();
        assert_eq!(sent[0].payload.as_ref().map(Vec::len), Some(report.command.byte_length));
    }

    fn short_timeouts() -> PipelineConfig {
        PipelineConfig {
            upload_timeout_ms: 50,
            dispatch_timeout_ms: 50,
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_upload_timeout_falls_back() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let pipeline = build_pipeline(Some(Arc::new(SlowStore)), dispatcher, short_timeouts());

        let request = ImageRequest::new("P1", "lamp", scenario_a_image()).with_target(2, 2);
        let report = pipeline.send_pixel_image(request).await.unwrap();
        assert_eq!(report.delivery_method, DeliveryMethod::Direct);
    }

    #[tokio::test]
    async fn test_dispatch_timeout_is_error() {
        let pipeline = build_pipeline(None, Arc::new(SlowDispatcher), short_timeouts());

        let request = ImageRequest::new("P1", "lamp", scenario_a_image()).with_target(2, 2);
        let err = pipeline.send_pixel_image(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DispatchError);
    }

    #[tokio::test]
    async fn test_use_store_false_skips_store() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = build_pipeline(
            Some(store.clone()),
            Arc::new(MemoryDispatcher::new()),
            PipelineConfig::default(),
        );

        let request = ImageRequest::new("P1", "lamp", scenario_a_image())
            .with_target(2, 2)
            .with_use_store(false);
        let report = pipeline.send_pixel_image(request).await.unwrap();
        assert_eq!(report.delivery_method, DeliveryMethod::Direct);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_image_is_fatal() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let pipeline = build_pipeline(None, dispatcher.clone(), PipelineConfig::default());

        let request = ImageRequest::new("P1", "lamp", scenario_a_image()).with_target(3, 2);
        let err = pipeline.send_pixel_image(request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert!(dispatcher.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_device_rejected() {
        let pipeline = build_pipeline(None, Arc::new(MemoryDispatcher::new()), PipelineConfig::default());
        let request = ImageRequest::new("P1", " ", scenario_a_image());
        assert!(pipeline.send_pixel_image(request).await.is_err());
    }

    #[tokio::test]
    async fn test_send_animation_frames() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = build_pipeline(Some(store.clone()), Arc::new(MemoryDispatcher::new()), PipelineConfig::default());

        let animation = AnimationInput::from_value(&json!({
            "palette": ["#000000", "#FF0000"],
            "loop_count": 2,
            "frames": [
                {"pixels": [[0, 1], [1, 0]], "duration": 300},
                {"pixels": [[1, 0], [0, 1]]}
            ]
        }))
        .unwrap();
        let request = AnimationRequest::new("P1", "lamp", animation)
            .with_frame_delay(150)
            .with_name("blink");
        let report = pipeline.send_animation(request).await.unwrap();

        let DeliveryDetails::Animation(info) = &report.details else {
            panic!("expected animation details");
        };
        assert_eq!((info.width, info.height), (32, 16));
        assert_eq!(info.frame_count, 2);
        assert_eq!(info.durations_ms, vec![300, 150]);
        assert_eq!(info.total_duration_ms, 450);
        assert_eq!(info.loop_count, 2);
        assert_eq!(info.source, AnimationSource::Frames);

        let asset = report.asset_info.unwrap();
        assert!(asset.key.ends_with(".gif"));
        assert_eq!(asset.content_type, "image/gif");
        let summary = inspect(&store.get(&asset.key).unwrap().body).unwrap();
        assert_eq!((summary.width, summary.height), (32, 16));
        assert_eq!(summary.frames.len(), 2);
        assert_eq!(summary.loop_count, LoopCount::Finite(2));
    }

    #[tokio::test]
    async fn test_frame_index_orders_frames() {
        let pipeline = build_pipeline(None, Arc::new(MemoryDispatcher::new()), PipelineConfig::default());
        let animation = AnimationInput::from_value(&json!([
            {"frame_index": 1, "pixel_matrix": [["#0000FF"]], "duration": 200},
            {"frame_index": 0, "pixel_matrix": [["#FF0000"]], "duration": 100}
        ]))
        .unwrap();
        let report = pipeline
            .send_animation(AnimationRequest::new("P1", "lamp", animation))
            .await
            .unwrap();

        let DeliveryDetails::Animation(info) = &report.details else {
            panic!("expected animation details");
        };
        assert_eq!(info.durations_ms, vec![100, 200]);
    }

    #[tokio::test]
    async fn test_empty_animation_is_encode_error() {
        let pipeline = build_pipeline(None, Arc::new(MemoryDispatcher::new()), PipelineConfig::default());
        let animation = AnimationInput::from_value(&json!({"frames": []})).unwrap();
        let err = pipeline
            .send_animation(AnimationRequest::new("P1", "lamp", animation))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EncodeError);
    }

    #[tokio::test]
    async fn test_zero_duration_rejected() {
        let pipeline = build_pipeline(None, Arc::new(MemoryDispatcher::new()), PipelineConfig::default());
        let animation = AnimationInput::from_value(&json!([
            {"pixels": [["#FF0000"]], "duration": 0}
        ]))
        .unwrap();
        let err = pipeline
            .send_animation(AnimationRequest::new("P1", "lamp", animation))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_convert_reports_size() {
        let pipeline = build_pipeline(None, Arc::new(MemoryDispatcher::new()), PipelineConfig::default());
        let report = pipeline
            .convert_image_to_pixels(ConvertRequest::new(scenario_a_image()).with_target(2, 2))
            .unwrap();
        assert_eq!(report.total_pixels, 4);
        assert_eq!(report.original_size, None);
        assert_eq!(report.input_format, "hex-grid");
    }

    #[test]
    fn test_builder_requires_dispatcher() {
        let err = DeliveryPipeline::builder(PipelineConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[test]
    fn test_ttl_bounds() {
        let pipeline = build_pipeline(None, Arc::new(MemoryDispatcher::new()), PipelineConfig::default());
        assert_eq!(pipeline.ttl(None).unwrap(), 900);
        assert_eq!(pipeline.ttl(Some(60)).unwrap(), 60);
        assert!(pipeline.ttl(Some(0)).is_err());
        assert!(pipeline.ttl(Some(MAX_TTL_SECONDS + 1)).is_err());
    }
}
