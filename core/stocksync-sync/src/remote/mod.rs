//! Remote store adapters.
//!
//! Two backend shapes are normalized behind [`RemoteStore`]:
//! - [`DirectBackend`]: collections addressed by name
//! - [`DocumentStoreBackend`]: collections behind opaque container ids
//!
//! The backend is chosen once, from configuration, by [`build_remote`].

pub mod direct;
pub mod document_store;
mod http;
pub mod payload;
pub mod store;

pub use direct::{DirectBackend, DirectConfig};
pub use document_store::{DocumentStoreBackend, DocumentStoreConfig};
pub use payload::{decode_records, DecodeError};
pub use store::RemoteStore;

use crate::config::{BackendConfig, SyncConfig};
use crate::error::SyncResult;
use crate::policy::ProtectedCollectionPolicy;
use crate::registry::EndpointRegistry;
use std::sync::Arc;
use tracing::info;

/// Builds the configured backend.
pub fn build_remote(
    config: &SyncConfig,
    registry: Arc<EndpointRegistry>,
    policy: Arc<ProtectedCollectionPolicy>,
) -> SyncResult<Arc<dyn RemoteStore>> {
    let timeout = config.request_timeout();
    let remote: Arc<dyn RemoteStore> = match &config.backend {
        BackendConfig::Direct(direct) => Arc::new(DirectBackend::new(direct.clone(), timeout)?),
        BackendConfig::DocumentStore(doc) => Arc::new(DocumentStoreBackend::new(
            doc.clone(),
            timeout,
            registry,
            policy,
        )?),
    };
    info!("Using {} remote backend", remote.backend_name());
    Ok(remote)
}
