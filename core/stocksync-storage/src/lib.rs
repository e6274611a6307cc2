//! Local persistence for StockSync.
//!
//! The sync engine needs only a durable string-blob store: get, set and
//! remove values by key. This crate defines that capability as the
//! [`KeyValueStore`] trait and ships two implementations:
//!
//! - [`SqliteStore`]: a single-table SQLite database, durable across restarts
//! - [`MemoryStore`]: a process-local map for tests and ephemeral sessions
//!
//! Values are opaque strings; [`get_json`] and [`set_json`] layer JSON on top.

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{get_json, set_json, KeyValueStore};
