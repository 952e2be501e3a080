//! Content-addressed packaging of device payloads.
//!
//! A payload is hashed, given a key of the form
//! `<namespace>/<device>/<YYYYMM>/<name>-<sha8>.<ext>`, uploaded with
//! immutable caching headers, and described by an [`AssetDescriptor`].
//! Identical payloads always produce identical keys.

mod store;

pub use store::{sign_url, FsStore, MemoryStore, ObjectStore, PutObject};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{PmugError, Result};

/// Cache header for uploaded assets. Keys change with content, so objects
/// never need revalidation.
pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "pmug";

/// Name used when the supplied name sanitizes to nothing.
pub const DEFAULT_ASSET_NAME: &str = "asset";

/// Kind of payload being packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// A JSON pixel matrix.
    Json,
    /// A GIF animation.
    Gif,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Json => "json",
            AssetKind::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            AssetKind::Json => "application/vnd.pmug.pixel+json",
            AssetKind::Gif => "image/gif",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lower-case hex sha256 of `payload`.
pub fn content_hash(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// The first eight characters of a content hash.
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

/// Restrict a caller-supplied name to `[A-Za-z0-9_-]`.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    if cleaned.is_empty() {
        DEFAULT_ASSET_NAME.to_string()
    } else {
        cleaned
    }
}

/// `<namespace>/<device>/<YYYYMM>/<name>-<sha8>.<ext>`
pub fn storage_key(
    namespace: &str,
    device: &str,
    at: DateTime<Utc>,
    name: &str,
    sha8: &str,
    kind: AssetKind,
) -> String {
    format!(
        "{}/{}/{}/{}",
        namespace,
        sanitize_name(device),
        at.format("%Y%m"),
        asset_file_name(name, sha8, kind)
    )
}

/// `<name>-<sha8>.<ext>`, the last segment of a storage key.
pub fn asset_file_name(name: &str, sha8: &str, kind: AssetKind) -> String {
    format!("{}-{}.{}", sanitize_name(name), sha8, kind.extension())
}

/// Descriptor of an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub key: String,
    pub sha256: String,
    pub short_hash: String,
    pub file_name: String,
    pub url: String,
    pub bytes: usize,
    pub width: u32,
    pub height: u32,
    pub frames: usize,
    /// Epoch seconds.
    pub expires_at: i64,
    pub content_type: String,
}

/// What is being packaged and for whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo<'a> {
    pub kind: AssetKind,
    pub name: &'a str,
    pub device_name: &'a str,
    pub product_id: &'a str,
    pub width: u32,
    pub height: u32,
    pub frames: usize,
}

/// Uploads payloads under content-addressed keys.
#[derive(Clone)]
pub struct Packager {
    namespace: String,
    store: Arc<dyn ObjectStore>,
}

impl fmt::Debug for Packager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packager")
            .field("namespace", &self.namespace)
            .field("store", &self.store.name())
            .finish()
    }
}

impl Packager {
    pub fn new(namespace: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            namespace: namespace.into(),
            store,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Hash, upload and describe `payload`.
    pub async fn package(
        &self,
        payload: &[u8],
        info: &AssetInfo<'_>,
        now: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Result<AssetDescriptor> {
        if info.device_name.is_empty() {
            return Err(PmugError::validation("Device name must not be empty"));
        }

        let expires = Duration::try_seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX))
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                PmugError::validation(format!("TTL of {}s is out of range", ttl_seconds))
            })?;

        let sha256 = content_hash(payload);
        let sha8 = short_hash(&sha256).to_string();
        let key = storage_key(&self.namespace, info.device_name, now, info.name, &sha8, info.kind);

        let metadata = BTreeMap::from([
            ("sha256".to_string(), sha256.clone()),
            ("width".to_string(), info.width.to_string()),
            ("height".to_string(), info.height.to_string()),
            ("frames".to_string(), info.frames.to_string()),
            ("device-name".to_string(), info.device_name.to_string()),
            ("product-id".to_string(), info.product_id.to_string()),
        ]);

        self.store
            .put(PutObject {
                key: key.clone(),
                body: payload.to_vec(),
                content_type: info.kind.content_type().to_string(),
                cache_control: CACHE_CONTROL.to_string(),
                metadata,
            })
            .await?;

        let url = self.store.retrieval_url(&key, expires).await?;

        tracing::info!(
            key = %key,
            bytes = payload.len(),
            store = self.store.name(),
            "uploaded asset"
        );

        Ok(AssetDescriptor {
            file_name: asset_file_name(info.name, &sha8, info.kind),
            key,
            sha256,
            short_hash: sha8,
            url,
            bytes: payload.len(),
            width: info.width,
            height: info.height,
            frames: info.frames,
            expires_at: expires.timestamp(),
            content_type: info.kind.content_type().to_string(),
        })
    }
}
