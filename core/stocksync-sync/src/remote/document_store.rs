//! Indirected document-store backend.
//!
//! Each collection lives in an opaque container whose identifier is kept in
//! the [`EndpointRegistry`]. Requests carry a static access credential header.
//!
//! - create:  `POST <base>` with the record array; the response carries the
//!   generated container id (`metadata.id` or `id`)
//! - fetch:   `GET <base>/<id>/latest`; the array arrives wrapped in `record`,
//!   possibly as a JSON-encoded string
//! - replace: `PUT <base>/<id>` with the record array

use super::http::{build_client, ensure_success, join_url, read_records};
use super::payload::{container_id_from_value, records_from_value, DecodeError};
use super::store::RemoteStore;
use crate::error::{SyncError, SyncResult};
use crate::policy::ProtectedCollectionPolicy;
use crate::registry::EndpointRegistry;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use stocksync_types::Record;
use tracing::{debug, info, warn};

const CONTAINER_NAME_HEADER: &str = "X-Bin-Name";
const CONTAINER_PRIVATE_HEADER: &str = "X-Bin-Private";

/// Document-store backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Base URL of the container API (e.g. `https://api.jsonbin.io/v3/b`).
    pub base_url: String,
    /// Static access credential sent with every request.
    pub access_key: String,
    /// Header carrying the credential.
    pub access_key_header: String,
    /// Whether newly created containers are private.
    pub private_containers: bool,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jsonbin.io/v3/b".to_string(),
            access_key: String::new(),
            access_key_header: "X-Master-Key".to_string(),
            private_containers: true,
        }
    }
}

/// Document-store backend.
pub struct DocumentStoreBackend {
    config: DocumentStoreConfig,
    client: Client,
    registry: Arc<EndpointRegistry>,
    policy: Arc<ProtectedCollectionPolicy>,
}

impl DocumentStoreBackend {
    /// Creates a backend resolving containers through `registry` and gating
    /// container creation with `policy`.
    pub fn new(
        config: DocumentStoreConfig,
        timeout: Duration,
        registry: Arc<EndpointRegistry>,
        policy: Arc<ProtectedCollectionPolicy>,
    ) -> SyncResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(SyncError::Config(
                "document store base_url is empty".to_string(),
            ));
        }
        if config.access_key_header.trim().is_empty() {
            return Err(SyncError::Config(
                "document store access_key_header is empty".to_string(),
            ));
        }
        Ok(Self {
            client: build_client(timeout)?,
            config,
            registry,
            policy,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(
            self.config.access_key_header.as_str(),
            self.config.access_key.as_str(),
        )
    }

    /// Creates a container holding `records` and records its id.
    async fn create_container(
        &self,
        endpoint: &str,
        records: &[Record],
    ) -> SyncResult<Vec<Record>> {
        self.policy.check_overwrite(endpoint)?;

        debug!("Creating container for '{}'", endpoint);

        let request = self
            .client
            .post(join_url(&self.config.base_url, ""))
            .header(CONTAINER_NAME_HEADER, endpoint)
            .header(
                CONTAINER_PRIVATE_HEADER,
                if self.config.private_containers { "true" } else { "false" },
            )
            .json(records);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(e, "container creation"))?;

        let response = ensure_success(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::from_reqwest(e, "container creation"))?;
        let value: Value = serde_json::from_slice(&bytes).map_err(DecodeError::from)?;

        let container_id = container_id_from_value(&value).ok_or_else(|| {
            DecodeError::UnexpectedShape("creation response has no container id".to_string())
        })?;

        self.registry
            .set_container_id(endpoint, &container_id)
            .await?;
        info!("Created container {} for '{}'", container_id, endpoint);

        match records_from_value(value, 0) {
            Ok(view) => Ok(view),
            Err(e) => {
                warn!("Creation response for '{}' has no record view: {}", endpoint, e);
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl RemoteStore for DocumentStoreBackend {
    fn backend_name(&self) -> &'static str {
        "document_store"
    }

    async fn fetch_collection(&self, endpoint: &str) -> SyncResult<Vec<Record>> {
        let Some(container_id) = self.registry.container_id(endpoint).await? else {
            debug!("No container for '{}' yet, nothing to fetch", endpoint);
            return Ok(Vec::new());
        };

        debug!("Fetching '{}' from container {}", endpoint, container_id);

        let request = self
            .client
            .get(join_url(&self.config.base_url, &format!("{container_id}/latest")));

        let response = self
            .authorized(request)
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
        let Some(container_id) = self.registry.container_id(endpoint).await? else {
            return self.create_container(endpoint, records).await;
        };

        debug!(
            "Replacing container {} for '{}' with {} records",
            container_id,
            endpoint,
            records.len()
        );

        let request = self
            .client
            .put(join_url(&self.config.base_url, &container_id))
            .json(records);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| SyncError::from_reqwest(e, "push"))?;

        let response = ensure_success(response).await?;
        read_records(response, endpoint, "push").await
    }
}
