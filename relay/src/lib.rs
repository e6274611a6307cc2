//! Shared state and HTTP API for the StockSync relay.
//!
//! The relay is the reference direct-by-name backend: collections are kept in
//! memory and every push is merged into the stored set with the same
//! last-write-wins rule the clients use, the stored side winning ties.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use stocksync_sync::{decode_records, merge};
use stocksync_types::Record;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// In-memory collection storage.
#[derive(Debug, Default)]
pub struct RelayState {
    collections: RwLock<HashMap<String, Vec<Record>>>,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored records of `endpoint`, tombstones included.
    pub async fn collection(&self, endpoint: &str) -> Vec<Record> {
        self.collections
            .read()
            .await
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    /// Merges `incoming` into the stored set and returns the result.
    pub async fn apply(&self, endpoint: &str, incoming: &[Record]) -> Vec<Record> {
        let mut collections = self.collections.write().await;
        let stored = collections.entry(endpoint.to_string()).or_default();
        let outcome = merge(stored.as_slice(), incoming, false);
        debug!(
            "'{}': merged {} incoming into {} stored, {} conflicts",
            endpoint,
            incoming.len(),
            stored.len(),
            outcome.conflicts.len()
        );
        *stored = outcome.records;
        stored.clone()
    }

    /// Number of collections that have received at least one push.
    pub async fn collection_count(&self) -> usize {
        self.collections.read().await.len()
    }
}

#[derive(Debug, Deserialize)]
struct EndpointQuery {
    endpoint: Option<String>,
}

impl EndpointQuery {
    fn require(self) -> Result<String, Response> {
        match self.endpoint {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(bad_request("missing `endpoint` query parameter")),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub collections: usize,
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

async fn get_handler(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<EndpointQuery>,
) -> Response {
    let endpoint = match query.require() {
        Ok(endpoint) => endpoint,
        Err(response) => return response,
    };
    let records = state.collection(&endpoint).await;
    debug!("GET '{}': {} records", endpoint, records.len());
    Json(records).into_response()
}

async fn sync_handler(
    State(state): State<Arc<RelayState>>,
    Query(query): Query<EndpointQuery>,
    body: Bytes,
) -> Response {
    let endpoint = match query.require() {
        Ok(endpoint) => endpoint,
        Err(response) => return response,
    };
    let incoming = match decode_records(&body) {
        Ok(records) => records,
        Err(e) => {
            warn!("Rejected push to '{}': {}", endpoint, e);
            return bad_request(&format!("invalid record payload: {e}"));
        }
    };

    let merged = state.apply(&endpoint, &incoming).await;
    info!(
        "Synced '{}': {} incoming, {} stored",
        endpoint,
        incoming.len(),
        merged.len()
    );
    Json(merged).into_response()
}

async fn health_handler(State(state): State<Arc<RelayState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        collections: state.collection_count().await,
    })
}

/// Build the HTTP API router over the given state.
pub fn build_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/get", get(get_handler))
        .route("/sync", post(sync_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}
