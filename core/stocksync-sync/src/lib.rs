//! Offline-first collection sync engine for StockSync.
//!
//! Keeps named record collections ("products", "sales", ...) converged across
//! devices that work offline and sync through a shared remote.
//!
//! # Architecture
//!
//! Collections are flat sets of [`Record`]s keyed by id. Each record carries
//! an `updatedAt` timestamp and the id of the device that last wrote it, and
//! merges are record-level last-write-wins. Deletions are tombstones
//! (`deleted: true`) that travel with the collection and are hidden from
//! callers.
//!
//! ## Components
//!
//! - **Merge**: pure LWW and override merges ([`merge`])
//! - **Remote**: the [`RemoteStore`] trait and its two HTTP backends
//! - **State**: device identity and the endpoint registry ([`SyncState`])
//! - **Policy**: which collections an untrusted device may push
//! - **Engine**: orchestrates the sync strategies ([`SyncEngine`])
//!
//! ## Sync Process
//!
//! 1. **Fetch**: read the remote collection (unreachable remote → local only)
//! 2. **Merge**: reconcile against the caller's local records
//! 3. **Stamp**: fill missing timestamps, set this device as last writer
//! 4. **Persist**: write the merged set to local storage
//! 5. **Push**: replace the remote collection, unless policy forbids it
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stocksync_storage::MemoryStore;
//! use stocksync_sync::{SyncConfig, SyncEngine};
//! use stocksync_types::Record;
//!
//! # async fn run() -> stocksync_sync::SyncResult<()> {
//! let engine = SyncEngine::from_config(&SyncConfig::default(), Arc::new(MemoryStore::new())).await?;
//!
//! let local = vec![Record::new("sale-1").with_field("total", 42)];
//! let visible = engine.instant_sync("sales", &local, false).await?;
//! # let _ = visible;
//! # Ok(())
//! # }
//! ```
//!
//! [`Record`]: stocksync_types::Record

pub mod config;
mod engine;
mod error;
pub mod identity;
pub mod merge;
pub mod policy;
pub mod registry;
pub mod remote;
pub mod state;

pub use config::{BackendConfig, SyncConfig};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use identity::{DeviceIdentity, DEVICE_ID_KEY};
pub use merge::{merge, merge_visible, override_merge, visible, MergeConflict, MergeOutcome, MergeSide};
pub use policy::{ProtectedCollectionPolicy, DEFAULT_PROTECTED_COLLECTIONS};
pub use registry::{EndpointMap, EndpointRegistry, CENTRAL_ENDPOINT_MAP_KEY, LEGACY_CONTAINER_KEY_PREFIX};
pub use remote::{
    build_remote, decode_records, DecodeError, DirectBackend, DirectConfig, DocumentStoreBackend,
    DocumentStoreConfig, RemoteStore,
};
pub use state::SyncState;
