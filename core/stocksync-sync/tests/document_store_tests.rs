use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stocksync_storage::{KeyValueStore, MemoryStore};
use stocksync_sync::{
    DocumentStoreBackend, DocumentStoreConfig, EndpointRegistry, ProtectedCollectionPolicy,
    RemoteStore, SyncError,
};
use stocksync_types::Record;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<EndpointRegistry>,
    backend: DocumentStoreBackend,
}

fn fixture(server: &MockServer, trusted: bool) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(EndpointRegistry::new(store.clone()));
    let policy = Arc::new(ProtectedCollectionPolicy::new(["products"], trusted));
    let config = DocumentStoreConfig {
        base_url: format!("{}/v3/b", server.uri()),
        access_key: "master-key".to_string(),
        ..Default::default()
    };
    let backend =
        DocumentStoreBackend::new(config, Duration::from_secs(5), Arc::clone(&registry), policy)
            .unwrap();
    Fixture {
        store,
        registry,
        backend,
    }
}

// ── Construction ────────────────────────────────────────────────

#[test]
fn document_store_config_default() {
    let cfg = DocumentStoreConfig::default();
    assert_eq!(cfg.base_url, "https://api.jsonbin.io/v3/b");
    assert_eq!(cfg.access_key_header, "X-Master-Key");
    assert!(cfg.access_key.is_empty());
    assert!(cfg.private_containers);
}

#[test]
fn blank_credential_header_is_config_error() {
    let store = Arc::new(MemoryStore::new());
    let result = DocumentStoreBackend::new(
        DocumentStoreConfig {
            access_key_header: String::new(),
            ..Default::default()
        },
        Duration::from_secs(1),
        Arc::new(EndpointRegistry::new(store)),
        Arc::new(ProtectedCollectionPolicy::default()),
    );
    assert!(matches!(result, Err(SyncError::Config(_))));
}

// ── Fetch ───────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_without_container_is_empty_and_silent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    assert!(fx.backend.fetch_collection("sales").await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_reads_latest_with_credential() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/b/bin-42/latest"))
        .and(header("X-Master-Key", "master-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": [{ "id": "s1", "updatedAt": 100 }],
            "metadata": { "id": "bin-42" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    fx.registry.set_container_id("sales", "bin-42").await.unwrap();

    let records = fx.backend.fetch_collection("sales").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].updated_at, Some(100));
}

#[tokio::test]
async fn fetch_unwraps_string_encoded_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/b/bin-7/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": "[{\"id\":\"a\"},{\"id\":\"b\",\"deleted\":true}]"
        })))
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    fx.registry.set_container_id("stock", "bin-7").await.unwrap();

    let records = fx.backend.fetch_collection("stock").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[1].deleted);
}

#[tokio::test]
async fn fetch_resolves_legacy_container_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/b/old-bin/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "record": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    fx.store.set("bin_id_expenses", "old-bin").await.unwrap();

    assert!(fx.backend.fetch_collection("expenses").await.unwrap().is_empty());
}

#[tokio::test]
async fn fetch_missing_container_is_status_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/b/gone/latest"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Bin not found" })))
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    fx.registry.set_container_id("sales", "gone").await.unwrap();

    let err = fx.backend.fetch_collection("sales").await.unwrap_err();
    assert!(matches!(err, SyncError::Status { status: 404, .. }));
}

// ── Push / create ───────────────────────────────────────────────

#[tokio::test]
async fn first_push_creates_container_and_records_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/b"))
        .and(header("X-Master-Key", "master-key"))
        .and(header("X-Bin-Name", "sales"))
        .and(header("X-Bin-Private", "true"))
        .and(body_json(json!([{ "id": "s1", "updatedAt": 1 }])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": [{ "id": "s1", "updatedAt": 1 }],
            "metadata": { "id": "new-bin", "private": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    let view = fx
        .backend
        .replace_collection("sales", &[Record::new("s1").with_updated_at(1)])
        .await
        .unwrap();

    assert_eq!(view.len(), 1);
    assert_eq!(
        fx.registry.container_id("sales").await.unwrap().as_deref(),
        Some("new-bin")
    );
    assert_eq!(
        fx.store.get("bin_id_sales").await.unwrap().as_deref(),
        Some("new-bin")
    );
}

#[tokio::test]
async fn push_to_known_container_replaces_it() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/v3/b/bin-1"))
        .and(header("X-Master-Key", "master-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": [{ "id": "a", "updatedAt": 2 }],
            "metadata": { "parentId": "bin-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    fx.registry.set_container_id("sales", "bin-1").await.unwrap();

    let view = fx
        .backend
        .replace_collection("sales", &[Record::new("a").with_updated_at(2)])
        .await
        .unwrap();
    assert_eq!(view[0].id, "a");
}

#[tokio::test]
async fn untrusted_device_never_creates_protected_container() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    let err = fx
        .backend
        .replace_collection("products", &[Record::new("p1")])
        .await
        .unwrap_err();

    assert!(err.is_policy_denied());
    assert_eq!(fx.registry.container_id("products").await.unwrap(), None);
}

#[tokio::test]
async fn trusted_device_creates_protected_container() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/b"))
        .and(header("X-Bin-Name", "products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "record": [],
            "metadata": { "id": "prod-bin" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture(&server, true);
    fx.backend
        .replace_collection("products", &[Record::new("p1")])
        .await
        .unwrap();

    assert_eq!(
        fx.registry.container_id("products").await.unwrap().as_deref(),
        Some("prod-bin")
    );
}

#[tokio::test]
async fn creation_without_id_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "record": [] })))
        .mount(&server)
        .await;

    let fx = fixture(&server, false);
    let err = fx
        .backend
        .replace_collection("sales", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Decode(_)));
    assert_eq!(fx.registry.container_id("sales").await.unwrap(), None);
}
