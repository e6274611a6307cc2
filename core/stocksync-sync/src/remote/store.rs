//! Remote store abstraction trait.
//!
//! Defines the one contract every backend shape is normalized to.

use crate::error::SyncResult;
use async_trait::async_trait;
use stocksync_types::Record;

/// Abstract remote collection store.
///
/// `Ok(vec![])` means the remote was reached and holds nothing for the
/// collection. An `Err` for which [`SyncError::is_transport`] is true means the
/// remote could not be consulted; callers proceed with local data.
///
/// [`SyncError::is_transport`]: crate::SyncError::is_transport
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the name of the backend.
    fn backend_name(&self) -> &'static str;

    /// Fetches the full, tombstone-inclusive record set of a collection.
    async fn fetch_collection(&self, endpoint: &str) -> SyncResult<Vec<Record>>;

    /// Replaces the remote collection with `records`.
    ///
    /// Returns the backend's own post-write view, which may differ from the
    /// input if the backend merges server-side. An empty return means the
    /// backend did not echo a view.
    async fn replace_collection(&self, endpoint: &str, records: &[Record])
        -> SyncResult<Vec<Record>>;
}
