//! Sync configuration.

use crate::error::{SyncError, SyncResult};
use crate::policy::DEFAULT_PROTECTED_COLLECTIONS;
use crate::remote::{DirectConfig, DocumentStoreConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which remote backend shape to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Collections addressed directly by name.
    Direct(DirectConfig),
    /// Collections behind registry-resolved container ids.
    DocumentStore(DocumentStoreConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Direct(DirectConfig::default())
    }
}

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether this device may create or overwrite protected collections.
    pub trusted_device: bool,
    /// Collections only a trusted device may push.
    pub protected_collections: Vec<String>,
    /// Upper bound on every remote request (ms).
    pub request_timeout_ms: u64,
    /// Remote backend.
    pub backend: BackendConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            trusted_device: false,
            protected_collections: DEFAULT_PROTECTED_COLLECTIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            request_timeout_ms: 30_000,
            backend: BackendConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SyncError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks invariants serde cannot express.
    pub fn validate(&self) -> SyncResult<()> {
        if self.request_timeout_ms == 0 {
            return Err(SyncError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
