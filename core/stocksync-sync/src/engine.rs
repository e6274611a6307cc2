//! Sync engine: the three collection sync strategies.
//!
//! Every strategy runs fetch → merge → persist-local → push, strictly in that
//! order, so a push never uploads local state that was not reconciled against
//! what the remote returned.
//!
//! - [`SyncEngine::instant_sync`]: full bidirectional LWW sync
//! - [`SyncEngine::background_sync`]: pull-only, `None` on failure
//! - [`SyncEngine::override_sync`]: local records win unconditionally
//!
//! Writing strategies on one collection are serialized by a per-collection
//! lock; different collections sync concurrently.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::identity::DEVICE_ID_KEY;
use crate::merge::{self, MergeOutcome};
use crate::policy::ProtectedCollectionPolicy;
use crate::registry::{EndpointMap, CENTRAL_ENDPOINT_MAP_KEY, LEGACY_CONTAINER_KEY_PREFIX};
use crate::remote::{build_remote, RemoteStore};
use crate::state::SyncState;
use std::collections::HashMap;
use std::sync::Arc;
use stocksync_storage::{get_json, set_json, KeyValueStore};
use stocksync_types::{now_millis, DeviceId, Record};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Orchestrates collection sync over one remote backend and one local store.
pub struct SyncEngine {
    state: Arc<SyncState>,
    remote: Arc<dyn RemoteStore>,
    policy: Arc<ProtectedCollectionPolicy>,
    collection_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncEngine {
    /// Creates an engine from explicit parts.
    pub fn new(
        state: Arc<SyncState>,
        remote: Arc<dyn RemoteStore>,
        policy: Arc<ProtectedCollectionPolicy>,
    ) -> Self {
        Self {
            state,
            remote,
            policy,
            collection_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Loads sync state from `store` and builds the configured backend.
    pub async fn from_config(config: &SyncConfig, store: Arc<dyn KeyValueStore>) -> SyncResult<Self> {
        config.validate()?;
        let state = Arc::new(SyncState::load(store).await?);
        let policy = Arc::new(ProtectedCollectionPolicy::new(
            config.protected_collections.iter().cloned(),
            config.trusted_device,
        ));
        let remote = build_remote(config, Arc::clone(state.registry()), Arc::clone(&policy))?;
        Ok(Self::new(state, remote, policy))
    }

    /// The sync state.
    pub fn state(&self) -> &Arc<SyncState> {
        &self.state
    }

    /// The protected-collection policy.
    pub fn policy(&self) -> &ProtectedCollectionPolicy {
        &self.policy
    }

    /// Name of the remote backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.remote.backend_name()
    }

    // ── Strategies ───────────────────────────────────────────────

    /// Full sync: fetch, merge (honouring `force_download`), stamp, persist,
    /// then push unless the remote was unreachable or the policy blocks it.
    ///
    /// Returns the visible (tombstone-free) result. Only local storage
    /// failures are errors; remote failures degrade to local data.
    pub async fn instant_sync(
        &self,
        endpoint: &str,
        local: &[Record],
        force_download: bool,
    ) -> SyncResult<Vec<Record>> {
        validate_endpoint(endpoint)?;
        let _guard = self.lock_collection(endpoint).await;

        let remote = self.fetch_or_fallback(endpoint).await?;
        let outcome = merge::merge(local, remote.as_deref().unwrap_or(&[]), force_download);
        log_conflicts(endpoint, &outcome);

        let device_id = self.state.device_id().await?;
        let now = now_millis();
        let mut records = outcome.records;
        for record in &mut records {
            record.stamp(now, device_id.as_str());
        }

        self.save_snapshot(endpoint, &records).await?;

        if remote.is_none() {
            info!(
                "instant_sync '{}': remote unreachable, kept {} local records, push skipped",
                endpoint,
                records.len()
            );
            return Ok(merge::visible(&records));
        }

        self.push(endpoint, records, "instant_sync").await
    }

    /// Pull-only sync: returns the remote's visible records, or `None` if the
    /// remote could not be read. Nothing is merged, persisted or pushed.
    pub async fn background_sync(&self, endpoint: &str) -> Option<Vec<Record>> {
        if let Err(e) = validate_endpoint(endpoint) {
            warn!("background_sync rejected: {}", e);
            return None;
        }

        match self.remote.fetch_collection(endpoint).await {
            Ok(records) => {
                debug!(
                    "background_sync '{}': fetched {} records",
                    endpoint,
                    records.len()
                );
                Some(merge::visible(&records))
            }
            Err(e) => {
                warn!("background_sync '{}' failed: {}", endpoint, e);
                None
            }
        }
    }

    /// Override sync: fetch, then overlay every local record onto the remote
    /// set (local wins regardless of timestamps, restamped with the current
    /// time and device id), persist and push.
    ///
    /// Remote-only ids survive, so sequential overrides from devices with
    /// disjoint data accumulate rather than erase each other.
    pub async fn override_sync(&self, endpoint: &str, local: &[Record]) -> SyncResult<Vec<Record>> {
        validate_endpoint(endpoint)?;
        let _guard = self.lock_collection(endpoint).await;

        let remote = self.fetch_or_fallback(endpoint).await?;
        let device_id = self.state.device_id().await?;
        let records = merge::override_merge(
            local,
            remote.as_deref().unwrap_or(&[]),
            now_millis(),
            device_id.as_str(),
        );

        self.save_snapshot(endpoint, &records).await?;

        if remote.is_none() {
            info!(
                "override_sync '{}': remote unreachable, kept {} local records, push skipped",
                endpoint,
                records.len()
            );
            return Ok(merge::visible(&records));
        }

        self.push(endpoint, records, "override_sync").await
    }

    // ── Local snapshots ──────────────────────────────────────────

    /// The last-synced snapshot of a collection, tombstones included.
    pub async fn local_snapshot(&self, endpoint: &str) -> SyncResult<Vec<Record>> {
        validate_endpoint(endpoint)?;
        let records: Option<Vec<Record>> = get_json(self.state.store().as_ref(), endpoint).await?;
        Ok(records.unwrap_or_default())
    }

    /// The last-synced snapshot of a collection, without tombstones.
    pub async fn local_records(&self, endpoint: &str) -> SyncResult<Vec<Record>> {
        Ok(merge::visible(&self.local_snapshot(endpoint).await?))
    }

    // ── Administrative operations ────────────────────────────────

    /// This installation's device id.
    pub async fn device_id(&self) -> SyncResult<DeviceId> {
        self.state.device_id().await
    }

    /// Dumps the endpoint → container map, e.g. to provision another device.
    pub async fn export_registry(&self) -> SyncResult<EndpointMap> {
        self.state.export_registry().await
    }

    /// Loads a map produced by [`export_registry`](Self::export_registry).
    pub async fn import_registry(&self, entries: EndpointMap) -> SyncResult<()> {
        self.state.import_registry(entries).await
    }

    /// Drops every registry entry; containers are recreated on next push.
    pub async fn clear_all_sync_state(&self) -> SyncResult<()> {
        self.state.clear_all().await
    }

    /// Forgets the device id; a new one is generated on next use.
    pub async fn clear_device_id(&self) -> SyncResult<()> {
        self.state.clear_device_id().await
    }

    // ── Internals ────────────────────────────────────────────────

    /// Held for the whole fetch → merge → persist → push sequence.
    async fn lock_collection(&self, endpoint: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.collection_locks.lock().await;
            Arc::clone(locks.entry(endpoint.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// `Some(records)` if the remote answered, `None` if it was unreachable.
    async fn fetch_or_fallback(&self, endpoint: &str) -> SyncResult<Option<Vec<Record>>> {
        match self.remote.fetch_collection(endpoint).await {
            Ok(records) => Ok(Some(records)),
            Err(e) if e.is_transport() => {
                warn!("Fetch of '{}' failed, proceeding with local data: {}", endpoint, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn save_snapshot(&self, endpoint: &str, records: &[Record]) -> SyncResult<()> {
        set_json(self.state.store().as_ref(), endpoint, records).await?;
        Ok(())
    }

    /// Pushes `records` and settles on what to return.
    async fn push(
        &self,
        endpoint: &str,
        records: Vec<Record>,
        strategy: &str,
    ) -> SyncResult<Vec<Record>> {
        if !self.policy.may_overwrite(endpoint) {
            info!(
                "{} '{}': protected collection on untrusted device, push skipped ({} records)",
                strategy,
                endpoint,
                records.len()
            );
            return Ok(merge::visible(&records));
        }

        match self.remote.replace_collection(endpoint, &records).await {
            Ok(server_view) if !server_view.is_empty() => {
                self.save_snapshot(endpoint, &server_view).await?;
                info!(
                    "{} '{}': pushed {} records, backend returned {}",
                    strategy,
                    endpoint,
                    records.len(),
                    server_view.len()
                );
                Ok(merge::visible(&server_view))
            }
            Ok(_) => {
                info!("{} '{}': pushed {} records", strategy, endpoint, records.len());
                Ok(merge::visible(&records))
            }
            Err(e) if e.is_policy_denied() => {
                info!("{} '{}': {}", strategy, endpoint, e);
                Ok(merge::visible(&records))
            }
            Err(e) if e.is_transport() => {
                warn!(
                    "{} '{}': push failed, keeping local result: {}",
                    strategy, endpoint, e
                );
                Ok(merge::visible(&records))
            }
            Err(e) => Err(e),
        }
    }
}

/// Rejects collection names that would collide with the engine's own keys.
fn validate_endpoint(endpoint: &str) -> SyncResult<()> {
    let reserved = endpoint == DEVICE_ID_KEY
        || endpoint == CENTRAL_ENDPOINT_MAP_KEY
        || endpoint.starts_with(LEGACY_CONTAINER_KEY_PREFIX);
    if endpoint.trim().is_empty() || reserved {
        return Err(SyncError::InvalidEndpoint(endpoint.to_string()));
    }
    Ok(())
}

fn log_conflicts(endpoint: &str, outcome: &MergeOutcome) {
    for conflict in &outcome.conflicts {
        debug!(
            "'{}' conflict on {}: local={:?} remote={:?} winner={:?}",
            endpoint,
            conflict.id,
            conflict.local_updated_at,
            conflict.remote_updated_at,
            conflict.winner
        );
    }
}
