//! Device identity.
//!
//! One id per installation, generated on first use and persisted under
//! [`DEVICE_ID_KEY`]. Later calls return the cached value.

use crate::error::SyncResult;
use std::sync::Arc;
use stocksync_storage::KeyValueStore;
use stocksync_types::DeviceId;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Local storage key holding the device id.
pub const DEVICE_ID_KEY: &str = "device_id";

/// Lazily generated, persisted device identity.
pub struct DeviceIdentity {
    store: Arc<dyn KeyValueStore>,
    cached: Mutex<Option<DeviceId>>,
}

impl DeviceIdentity {
    /// Creates an identity backed by `store`. Nothing is read until first use.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Returns the device id, generating and persisting one on first call.
    pub async fn device_id(&self) -> SyncResult<DeviceId> {
        let mut cached = self.cached.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        if let Some(raw) = self.store.get(DEVICE_ID_KEY).await? {
            match DeviceId::parse(&raw) {
                Ok(id) => {
                    *cached = Some(id.clone());
                    return Ok(id);
                }
                Err(e) => warn!("Ignoring stored device id: {}", e),
            }
        }

        let id = DeviceId::generate();
        self.store.set(DEVICE_ID_KEY, id.as_str()).await?;
        info!("Generated device id {}", id);
        *cached = Some(id.clone());
        Ok(id)
    }

    /// Forgets the device id. The next [`device_id`](Self::device_id) call
    /// generates a new one.
    pub async fn clear(&self) -> SyncResult<()> {
        let mut cached = self.cached.lock().await;
        self.store.remove(DEVICE_ID_KEY).await?;
        *cached = None;
        info!("Cleared device id");
        Ok(())
    }
}
