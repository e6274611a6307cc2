//! Direct-by-name HTTP backend.
//!
//! Collections are addressed by their logical name; there is no container
//! indirection.
//!
//! - `GET  <base>/get?endpoint=<name>` returns the record array
//! - `POST <base>/sync?endpoint=<name>` takes the record array and returns the
//!   backend's post-merge state

use super::http::{build_client, ensure_success, join_url, read_records};
use super::store::RemoteStore;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stocksync_types::Record;
use tracing::debug;

/// Direct backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    /// Base URL of the sync service (e.g. `http://localhost:4010`).
    pub base_url: String,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4010".to_string(),
        }
    }
}

/// Direct-by-name backend.
pub struct DirectBackend {
    config: DirectConfig,
    client: Client,
}

impl DirectBackend {
    /// Creates a backend whose requests time out after `timeout`.
    pub fn new(config: DirectConfig, timeout: Duration) -> SyncResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(SyncError::Config("direct backend base_url is empty".to_string()));
        }
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait]
impl RemoteStore for DirectBackend {
    fn backend_name(&self) -> &'static str {
        "direct"
    }

    async fn fetch_collection(&self, endpoint: &str) -> SyncResult<Vec<Record>> {
        debug!("Fetching '{}' from {}", endpoint, self.config.base_url);

        let response = self
            .client
            .get(join_url(&self.config.base_url, "get"))
            .query(&[("endpoint", endpoint)])
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(e, "fetch"))?;

        let response = ensure_success(response).await?;
        read_records(response, endpoint, "fetch").await
    }

    async fn replace_collection(
        &self,
        endpoint: &str,
        records: &[Record],
    ) -> SyncResult<Vec<Record>> {
        debug!(
            "Pushing {} records for '{}' to {}",
            records.len(),
            endpoint,
            self.config.base_url
        );

        let response = self
            .client
            .post(join_url(&self.config.base_url, "sync"))
            .query(&[("endpoint", endpoint)])
            .json(records)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(e, "push"))?;

        let response = ensure_success(response).await?;
        read_records(response, endpoint, "push").await
    }
}
