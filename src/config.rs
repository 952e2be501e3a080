//! Pipeline configuration (pmug.yaml).
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PmugError, Result};
use crate::normalize::DEFAULT_MAX_RASTER_BYTES;
use crate::package::DEFAULT_NAMESPACE;
use crate::render::{CanvasSize, PalettePolicy, DEFAULT_MAX_FRAMES, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::types::{MAX_DIMENSION, MIN_DIMENSION};

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "pmug.yaml";

/// Longest URL lifetime accepted (seven days).
pub const MAX_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// How base64 raster payloads are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RasterMode {
    /// Decode with the image codecs.
    #[default]
    Codec,
    /// Derive a deterministic pattern from the payload hash instead of
    /// decoding. Only for hosts without codecs.
    HashPattern,
}

/// Object store settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory objects are written to. No store is used when unset.
    pub root: Option<PathBuf>,
    /// Base URL devices fetch objects from.
    pub public_base_url: Option<String>,
    /// Secret for time-limited URLs.
    pub signing_secret: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// First segment of every storage key.
    pub namespace: String,
    /// Canvas animations are composited onto.
    pub canvas: CanvasSize,
    /// Size single images are normalized to when the request gives none.
    pub default_target: CanvasSize,
    /// Lifetime of retrieval URLs.
    pub ttl_seconds: u64,
    /// Upload to the object store when one is configured.
    pub use_store: bool,
    /// Use one colour table for all frames of an animation.
    pub shared_palette: bool,
    pub raster_mode: RasterMode,
    pub upload_timeout_ms: u64,
    pub dispatch_timeout_ms: u64,
    pub max_frames: usize,
    pub max_payload_bytes: usize,
    pub max_raster_bytes: usize,
    pub store: StoreConfig,
    /// JSON-lines file commands are appended to.
    pub outbox: PathBuf,
    pub logging: LoggingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            canvas: CanvasSize::new(32, 16),
            default_target: CanvasSize::new(16, 16),
            ttl_seconds: 900,
            use_store: true,
            shared_palette: false,
            raster_mode: RasterMode::Codec,
            upload_timeout_ms: 10_000,
            dispatch_timeout_ms: 10_000,
            max_frames: DEFAULT_MAX_FRAMES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_raster_bytes: DEFAULT_MAX_RASTER_BYTES,
            store: StoreConfig::default(),
            outbox: PathBuf::from("pmug-outbox.jsonl"),
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PmugError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read config: {}", e),
        })?;

        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `pmug.yaml` if present, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse configuration from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| PmugError::Config {
            message: format!("Invalid config: {}", e),
            help: Some("Check pmug.yaml syntax".to_string()),
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let config_err = |message: String, help: &str| PmugError::Config {
            message,
            help: Some(help.to_string()),
        };

        if self.namespace.is_empty() || self.namespace.contains('/') {
            return Err(config_err(
                format!("Invalid namespace {:?}", self.namespace),
                "Use a single non-empty path segment, e.g. pmug",
            ));
        }

        for (field, size) in [("canvas", self.canvas), ("default_target", self.default_target)] {
            let range = MIN_DIMENSION..=MAX_DIMENSION;
            if !range.contains(&size.width) || !range.contains(&size.height) {
                return Err(config_err(
                    format!("{} is {}x{}", field, size.width, size.height),
                    "Width and height must be between 1 and 128",
                ));
            }
        }

        if self.upload_timeout_ms == 0 || self.dispatch_timeout_ms == 0 {
            return Err(config_err(
                "Timeouts must be greater than zero".to_string(),
                "Set upload_timeout_ms and dispatch_timeout_ms in milliseconds",
            ));
        }

        if self.ttl_seconds == 0 || self.ttl_seconds > MAX_TTL_SECONDS {
            return Err(config_err(
                format!("ttl_seconds is {}", self.ttl_seconds),
                "URL lifetime must be between 1 second and 7 days",
            ));
        }

        if self.max_frames == 0 || self.max_payload_bytes == 0 || self.max_raster_bytes == 0 {
            return Err(config_err(
                "Resource limits must be greater than zero".to_string(),
                "Check max_frames, max_payload_bytes and max_raster_bytes",
            ));
        }

        Ok(())
    }

    pub fn palette_policy(&self) -> PalettePolicy {
        PalettePolicy::from_shared(self.shared_palette)
    }
}
