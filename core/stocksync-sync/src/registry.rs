//! Endpoint registry: logical collection name to remote container id.
//!
//! The consolidated map under [`CENTRAL_ENDPOINT_MAP_KEY`] is the source of
//! truth. Every entry is mirrored to a legacy per-endpoint key
//! (`bin_id_<endpoint>`) that older installations wrote; those keys are read
//! only when the consolidated map has no entry, and a hit is promoted into the
//! map.

use crate::error::SyncResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use stocksync_storage::KeyValueStore;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Local storage key holding the consolidated endpoint map.
pub const CENTRAL_ENDPOINT_MAP_KEY: &str = "central_endpoint_map";

/// Prefix of the legacy per-endpoint mirror keys.
pub const LEGACY_CONTAINER_KEY_PREFIX: &str = "bin_id_";

/// The full endpoint to container-id mapping.
pub type EndpointMap = BTreeMap<String, String>;

/// Returns the legacy mirror key for `endpoint`.
pub fn legacy_key(endpoint: &str) -> String {
    format!("{LEGACY_CONTAINER_KEY_PREFIX}{endpoint}")
}

/// Cached, persisted endpoint registry.
pub struct EndpointRegistry {
    store: Arc<dyn KeyValueStore>,
    /// `None` until the consolidated map has been read from the store.
    cache: RwLock<Option<EndpointMap>>,
}

impl EndpointRegistry {
    /// Creates a registry backed by `store`. Nothing is read until first use.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
        }
    }

    /// Reads the consolidated map into the cache, replacing what was there.
    pub async fn load(&self) -> SyncResult<()> {
        let map = self.read_stored_map().await?;
        debug!("Loaded {} endpoint registry entries", map.len());
        *self.cache.write().await = Some(map);
        Ok(())
    }

    /// Writes the cached map back to the store.
    pub async fn save(&self) -> SyncResult<()> {
        let guard = self.cache.read().await;
        if let Some(map) = guard.as_ref() {
            self.write_stored_map(map).await?;
        }
        Ok(())
    }

    /// Resolves the container id for `endpoint`.
    pub async fn container_id(&self, endpoint: &str) -> SyncResult<Option<String>> {
        {
            let guard = self.cache.read().await;
            if let Some(map) = guard.as_ref() {
                if let Some(id) = map.get(endpoint) {
                    return Ok(Some(id.clone()));
                }
            }
        }

        let mut guard = self.cache.write().await;
        let map = self.loaded(&mut *guard).await?;
        if let Some(id) = map.get(endpoint) {
            return Ok(Some(id.clone()));
        }

        let legacy = self.store.get(&legacy_key(endpoint)).await?;
        match legacy.map(|s| s.trim().to_string()) {
            Some(id) if !id.is_empty() => {
                info!("Promoting legacy container id for '{}'", endpoint);
                map.insert(endpoint.to_string(), id.clone());
                self.write_stored_map(map).await?;
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    /// Records the container id for `endpoint` in the map and its legacy mirror.
    pub async fn set_container_id(&self, endpoint: &str, container_id: &str) -> SyncResult<()> {
        let mut guard = self.cache.write().await;
        let map = self.loaded(&mut *guard).await?;
        map.insert(endpoint.to_string(), container_id.to_string());
        self.write_stored_map(map).await?;
        self.store.set(&legacy_key(endpoint), container_id).await?;
        Ok(())
    }

    /// Returns a copy of the full mapping.
    pub async fn export(&self) -> SyncResult<EndpointMap> {
        let mut guard = self.cache.write().await;
        Ok(self.loaded(&mut *guard).await?.clone())
    }

    /// Loads a previously exported mapping. Imported entries overwrite
    /// existing ones with the same endpoint; other entries are kept.
    pub async fn import(&self, entries: EndpointMap) -> SyncResult<()> {
        let mut guard = self.cache.write().await;
        let map = self.loaded(&mut *guard).await?;
        let count = entries.len();
        for (endpoint, container_id) in entries {
            self.store.set(&legacy_key(&endpoint), &container_id).await?;
            map.insert(endpoint, container_id);
        }
        self.write_stored_map(map).await?;
        info!("Imported {} endpoint registry entries", count);
        Ok(())
    }

    /// Drops every entry, including legacy mirrors with no map entry.
    pub async fn clear_all(&self) -> SyncResult<()> {
        let mut guard = self.cache.write().await;
        for key in self
            .store
            .keys_with_prefix(LEGACY_CONTAINER_KEY_PREFIX)
            .await?
        {
            self.store.remove(&key).await?;
        }
        self.store.remove(CENTRAL_ENDPOINT_MAP_KEY).await?;
        *guard = Some(EndpointMap::new());
        info!("Cleared endpoint registry");
        Ok(())
    }

    async fn loaded<'a>(
        &self,
        slot: &'a mut Option<EndpointMap>,
    ) -> SyncResult<&'a mut EndpointMap> {
        if slot.is_none() {
            *slot = Some(self.read_stored_map().await?);
        }
        Ok(slot.get_or_insert_with(EndpointMap::new))
    }

    async fn read_stored_map(&self) -> SyncResult<EndpointMap> {
        let Some(raw) = self.store.get(CENTRAL_ENDPOINT_MAP_KEY).await? else {
            return Ok(EndpointMap::new());
        };
        match serde_json::from_str::<EndpointMap>(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!("Stored endpoint map is unreadable, starting empty: {}", e);
                Ok(EndpointMap::new())
            }
        }
    }

    async fn write_stored_map(&self, map: &EndpointMap) -> SyncResult<()> {
        let raw = serde_json::to_string(map)?;
        self.store.set(CENTRAL_ENDPOINT_MAP_KEY, &raw).await?;
        Ok(())
    }
}
