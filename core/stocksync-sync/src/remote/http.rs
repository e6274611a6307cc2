//! Shared HTTP plumbing for the remote backends.

use super::payload::decode_records;
use crate::error::{SyncError, SyncResult};
use reqwest::{Client, Response};
use std::time::Duration;
use stocksync_types::Record;
use tracing::warn;

/// Builds the HTTP client used by a backend. Every request is bounded by
/// `timeout`.
pub(crate) fn build_client(timeout: Duration) -> SyncResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))
}

/// Joins a base URL and a path segment without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Turns a non-success status into `SyncError::Status`.
pub(crate) async fn ensure_success(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Reads a response body as records. Malformed payloads are logged and read
/// as an empty collection.
pub(crate) async fn read_records(
    response: Response,
    endpoint: &str,
    context: &str,
) -> SyncResult<Vec<Record>> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| SyncError::from_reqwest(e, context))?;

    match decode_records(&bytes) {
        Ok(records) => Ok(records),
        Err(e) => {
            warn!(
                "Malformed {} payload for '{}', treating as empty: {}",
                context, endpoint, e
            );
            Ok(Vec::new())
        }
    }
}
