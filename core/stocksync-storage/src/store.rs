//! The key-value capability consumed by the sync engine.

use crate::error::StorageResult;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A durable string-blob store.
///
/// Implementations must serialize concurrent writes to the same key; the
/// engine relies on this for read-modify-write of its own keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Lists every key starting with `prefix`, in ascending order.
    async fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Reads and decodes a JSON value.
pub async fn get_json<T>(store: &dyn KeyValueStore, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes and stores a JSON value.
pub async fn set_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> StorageResult<()>
where
    T: Serialize + Sync + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}
