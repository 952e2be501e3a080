//! Object storage backends.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PmugError, Result};

/// An object to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutObject {
    pub key: String,
    #[serde(skip)]
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
    pub metadata: BTreeMap<String, String>,
}

/// Destination for packaged assets.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Store an object under its key, replacing any existing object.
    async fn put(&self, object: PutObject) -> Result<()>;

    /// URL a device can fetch `key` from until `expires_at`.
    ///
    /// Stores without signing return a stable URL and ignore the expiry.
    async fn retrieval_url(&self, key: &str, expires_at: DateTime<Utc>) -> Result<String>;
}

/// Writes objects below a root directory.
///
/// Each object gets a `<key>.meta.json` sidecar holding its headers and
/// metadata.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    public_base_url: Option<String>,
    signing_secret: Option<String>,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            public_base_url: None,
            signing_secret: None,
        }
    }

    /// Serve URLs from this base instead of `file://` paths.
    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(base.into());
        self
    }

    /// Sign URLs with this secret.
    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `key`.
    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|part| part.is_empty() || part == "." || part == "..")
        {
            return Err(PmugError::store(format!("Invalid object key {:?}", key)));
        }
        Ok(self.root.join(key))
    }

    fn base_url(&self, key: &str) -> Result<String> {
        match &self.public_base_url {
            Some(base) => Ok(format!("{}/{}", base.trim_end_matches('/'), key)),
            None => Ok(format!("file://{}", self.object_path(key)?.display())),
        }
    }
}

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 of `"<key>\n<expires>"`, hex encoded.
pub fn sign_url(secret: &str, key: &str, expires: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PmugError::store(format!("Invalid signing secret: {}", e)))?;
    mac.update(key.as_bytes());
    mac.update(b"\n");
    mac.update(expires.to_string().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait::async_trait]
impl ObjectStore for FsStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn put(&self, object: PutObject) -> Result<()> {
        let path = self.object_path(&object.key)?;
        let io_err = |path: &Path, e: std::io::Error| {
            PmugError::store(format!("Failed to write {}: {}", path.display(), e))
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }
        tokio::fs::write(&path, &object.body)
            .await
            .map_err(|e| io_err(path.as_path(), e))?;

        let sidecar = path.with_file_name(format!(
            "{}.meta.json",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("object")
        ));
        let meta = serde_json::to_vec_pretty(&object)
            .map_err(|e| PmugError::store(format!("Failed to serialize metadata: {}", e)))?;
        tokio::fs::write(&sidecar, meta)
            .await
            .map_err(|e| io_err(sidecar.as_path(), e))?;

        tracing::debug!(key = %object.key, path = %path.display(), "stored object");
        Ok(())
    }

    async fn retrieval_url(&self, key: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let url = self.base_url(key)?;
        match &self.signing_secret {
            Some(secret) => {
                let expires = expires_at.timestamp();
                Ok(format!(
                    "{}?expires={}&signature={}",
                    url,
                    expires,
                    sign_url(secret, key, expires)?
                ))
            }
            None => Ok(url),
        }
    }
}

/// Keeps objects in memory. Used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, PutObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stored object, if present.
    pub fn get(&self, key: &str) -> Option<PutObject> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, object: PutObject) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| PmugError::store("Memory store lock poisoned"))?;
        objects.insert(object.key.clone(), object);
        Ok(())
    }

    async fn retrieval_url(&self, key: &str, _expires_at: DateTime<Utc>) -> Result<String> {
        Ok(format!("memory://{}", key))
    }
}
