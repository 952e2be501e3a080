//! Device commands and the dispatchers that deliver them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::{PmugError, Result};

/// URL placeholder telling the device the payload travels with the command.
pub const DIRECT_TRANSMISSION: &str = "direct_transmission";

/// Port for a retrieval URL: 443 for `https://`, 80 for anything else.
pub fn port_for(url: &str) -> u16 {
    let is_https = url
        .get(..8)
        .map(|scheme| scheme.eq_ignore_ascii_case("https://"))
        .unwrap_or(false);
    if is_https {
        443
    } else {
        80
    }
}

/// The command a device receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCommand {
    pub file_name: String,
    pub byte_length: usize,
    /// Retrieval URL or [`DIRECT_TRANSMISSION`].
    pub url: String,
    pub port: u16,
}

impl DeliveryCommand {
    /// Fetch the asset from `url`.
    pub fn fetch(file_name: impl Into<String>, byte_length: usize, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            file_name: file_name.into(),
            byte_length,
            port: port_for(&url),
            url,
        }
    }

    /// The payload is sent alongside the command.
    pub fn direct(file_name: impl Into<String>, byte_length: usize) -> Self {
        Self::fetch(file_name, byte_length, DIRECT_TRANSMISSION)
    }

    pub fn is_direct(&self) -> bool {
        self.url == DIRECT_TRANSMISSION
    }
}

/// Which device operation a command triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAction {
    SendPixelImage,
    SendGifAnimation,
}

/// A command addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub product_id: String,
    pub device_name: String,
    pub action: DeviceAction,
    pub command: DeliveryCommand,
    /// The payload itself, present for direct transmission.
    pub payload: Option<Vec<u8>>,
}

/// Acknowledgement from a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub correlation_id: String,
}

/// Sends commands to devices.
#[async_trait::async_trait]
pub trait DeviceDispatcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReceipt>;
}

/// One outbox line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxRecord {
    pub device_name: String,
    pub product_id: String,
    pub action: DeviceAction,
    pub command: DeliveryCommand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_base64: Option<String>,
}

impl From<&DispatchRequest> for OutboxRecord {
    fn from(request: &DispatchRequest) -> Self {
        Self {
            device_name: request.device_name.clone(),
            product_id: request.product_id.clone(),
            action: request.action,
            command: request.command.clone(),
            payload_base64: request.payload.as_deref().map(|p| BASE64_STANDARD.encode(p)),
        }
    }
}

/// Correlation id for a serialized record: the first 16 hex characters of
/// its sha256.
pub fn correlation_id(line: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(line));
    digest[..16].to_string()
}

/// Appends commands as JSON lines to a file, for a device bridge to pick up.
#[derive(Debug)]
pub struct OutboxDispatcher {
    path: PathBuf,
    // Serializes appends so concurrent lines never interleave
    lock: tokio::sync::Mutex<()>,
}

impl OutboxDispatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl DeviceDispatcher for OutboxDispatcher {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReceipt> {
        let record = OutboxRecord::from(&request);
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| PmugError::dispatch(format!("Failed to serialize command: {}", e)))?;
        let correlation_id = correlation_id(&line);
        line.push(b'\n');

        let io_err = |e: std::io::Error| PmugError::Dispatch {
            message: format!("Failed to write outbox {}: {}", self.path.display(), e),
            help: Some("Check the outbox path in pmug.yaml".to_string()),
        };

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        file.write_all(&line).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        tracing::debug!(
            device = %request.device_name,
            correlation_id = %correlation_id,
            path = %self.path.display(),
            "appended command to outbox"
        );

        Ok(DispatchReceipt { correlation_id })
    }
}

/// Keeps dispatched requests in memory. Used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    sent: Mutex<Vec<DispatchRequest>>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests dispatched so far.
    pub fn sent(&self) -> Vec<DispatchRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DeviceDispatcher for MemoryDispatcher {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchReceipt> {
        let record = serde_json::to_vec(&OutboxRecord::from(&request))
            .map_err(|e| PmugError::dispatch(format!("Failed to serialize command: {}", e)))?;
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| PmugError::dispatch("Memory dispatcher lock poisoned"))?;
        sent.push(request);
        Ok(DispatchReceipt {
            correlation_id: correlation_id(&record),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(payload: Option<Vec<u8>>) -> DispatchRequest {
        let command = match payload {
            Some(ref p) => DeliveryCommand::direct("a.json", p.len()),
            None => DeliveryCommand::fetch("a.gif", 10, "https://cdn.example.com/a.gif"),
        };
        DispatchRequest {
            product_id: "P1".to_string(),
            device_name: "lamp".to_string(),
            action: DeviceAction::SendPixelImage,
            command,
            payload,
        }
    }

    #[test]
    fn test_port_selection() {
        assert_eq!(port_for("https://x/y"), 443);
        assert_eq!(port_for("HTTPS://x/y"), 443);
        assert_eq!(port_for("http://x/y"), 80);
        assert_eq!(port_for(DIRECT_TRANSMISSION), 80);
        assert_eq!(port_for("memory://k"), 80);
        assert_eq!(port_for(""), 80);
    }

    #[test]
    fn test_direct_command() {
        let command = DeliveryCommand::direct("a.json", 12);
        assert!(command.is_direct());
        assert_eq!(command.port, 80);
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            serde_json::json!({
                "fileName": "a.json",
                "byteLength": 12,
                "url": "direct_transmission",
                "port": 80
            })
        );
    }

    #[tokio::test]
    async fn test_outbox_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/commands.jsonl");
        let dispatcher = OutboxDispatcher::new(&path);

        let first = dispatcher.dispatch(request(None)).await.unwrap();
        let second = dispatcher.dispatch(request(Some(b"{}".to_vec()))).await.unwrap();
        assert_ne!(first.correlation_id, second.correlation_id);
        assert_eq!(first.correlation_id.len(), 16);

        let content = std::fs::read_to_string(&path).unwrap();
        let records: Vec<OutboxRecord> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].command.port, 443);
        assert_eq!(records[0].payload_base64, None);
        assert_eq!(records[1].payload_base64.as_deref(), Some("e30="));
        assert_eq!(records[1].action, DeviceAction::SendPixelImage);
    }

    #[tokio::test]
    async fn test_memory_dispatcher_records() {
        let dispatcher = MemoryDispatcher::new();
        dispatcher.dispatch(request(None)).await.unwrap();
        assert_eq!(dispatcher.sent().len(), 1);
        assert_eq!(dispatcher.sent()[0].device_name, "lamp");
    }
}
