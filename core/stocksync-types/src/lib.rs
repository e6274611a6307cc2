//! Core type definitions for StockSync.
//!
//! This crate defines the collection-agnostic types shared by the sync engine:
//! - `Record`, the unit of replication (id + `updatedAt` + opaque domain fields)
//! - `DeviceId`, the per-installation writer identity
//! - Millisecond wall-clock helpers used for last-write-wins stamping
//!
//! Domain-specific shapes (products, stock checks, attendance, ...) never
//! appear here; the engine treats everything beyond the sync fields as opaque.

mod ids;
mod record;
mod timestamp;

pub use ids::DeviceId;
pub use record::{Record, RecordId};
pub use timestamp::{now_millis, Millis};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),
}
