//! Sync state owned by the engine.
//!
//! Bundles the two process-wide caches (device identity and endpoint
//! registry) over one local store, so they can be injected and faked rather
//! than living in globals.

use crate::error::SyncResult;
use crate::identity::DeviceIdentity;
use crate::registry::{EndpointMap, EndpointRegistry};
use std::sync::Arc;
use stocksync_storage::KeyValueStore;
use stocksync_types::DeviceId;

/// Device identity plus endpoint registry.
pub struct SyncState {
    store: Arc<dyn KeyValueStore>,
    identity: DeviceIdentity,
    registry: Arc<EndpointRegistry>,
}

impl SyncState {
    /// Creates state over `store` without reading anything yet.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            identity: DeviceIdentity::new(Arc::clone(&store)),
            registry: Arc::new(EndpointRegistry::new(Arc::clone(&store))),
            store,
        }
    }

    /// Creates state over `store` and warms both caches.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> SyncResult<Self> {
        let state = Self::new(store);
        state.identity.device_id().await?;
        state.registry.load().await?;
        Ok(state)
    }

    /// Persists the registry cache.
    pub async fn save(&self) -> SyncResult<()> {
        self.registry.save().await
    }

    /// The local store this state lives in.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// The endpoint registry.
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    /// Returns this installation's device id.
    pub async fn device_id(&self) -> SyncResult<DeviceId> {
        self.identity.device_id().await
    }

    /// Forgets the device id; a new one is generated on next use.
    pub async fn clear_device_id(&self) -> SyncResult<()> {
        self.identity.clear().await
    }

    /// Dumps the endpoint registry.
    pub async fn export_registry(&self) -> SyncResult<EndpointMap> {
        self.registry.export().await
    }

    /// Loads an exported endpoint registry.
    pub async fn import_registry(&self, entries: EndpointMap) -> SyncResult<()> {
        self.registry.import(entries).await
    }

    /// Drops every registry entry, forcing containers to be recreated.
    pub async fn clear_all(&self) -> SyncResult<()> {
        self.registry.clear_all().await
    }
}
