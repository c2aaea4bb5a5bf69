mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use helpers::{setup_test_app, UrlFetcher, GOOD_URL, HUGE_URL, SHOP, SMALL_URL};
use pixgate_api::webhooks::WebhookTopic;
use pixgate_api::{AppState, DeliveryOutcome, WebhookDelivery};
use pixgate_core::Config;
use pixgate_services::{
    CasOutcome, KeyValueStore, MemoryStore, StorageBackend, StorageError, StorageResult,
    VersionedValue,
};
use serde_json::json;

/// Memory store whose second policy read fails.
#[derive(Default)]
struct FlakyPolicyStore {
    inner: MemoryStore,
    policy_reads: AtomicUsize,
}

#[async_trait]
impl KeyValueStore for FlakyPolicyStore {
    async fn get(&self, key: &str) -> StorageResult<Option<VersionedValue>> {
        if key.ends_with("/policy") && self.policy_reads.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(StorageError::ReadFailed("replica unavailable".to_string()));
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<u64> {
        self.inner.put(key, value).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> StorageResult<CasOutcome> {
        self.inner.compare_and_swap(key, expected_version, value).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

fn payload(images: &[&str]) -> serde_json::Value {
    json!({
        "id": 632910392,
        "title": "Ceramic mug",
        "images": images.iter().map(|src| json!({ "src": src })).collect::<Vec<_>>()
    })
}

#[tokio::test]
async fn test_webhook_validates_every_image() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/webhooks/products/create")
        .add_header("X-Shopify-Shop-Domain", SHOP)
        .add_header("X-Shopify-Webhook-Id", "delivery-1")
        .add_header("X-Shopify-Topic", "products/create")
        .json(&payload(&[GOOD_URL, HUGE_URL, SMALL_URL]))
        .await;
    assert_eq!(response.status_code(), 200);

    let stats = app.wait_for_total(3).await;
    assert_eq!(stats["totalImages"], 3);
    assert_eq!(stats["rejectedImages"], 2);
}

#[tokio::test]
async fn test_duplicate_delivery_counts_once() {
    let app = setup_test_app();

    for _ in 0..2 {
        let response = app
            .client()
            .post("/api/webhooks/products/update")
            .add_header("X-Shopify-Shop-Domain", SHOP)
            .add_header("X-Shopify-Webhook-Id", "delivery-7")
            .json(&payload(&[GOOD_URL]))
            .await;
        assert_eq!(response.status_code(), 200);
    }

    let stats = app.wait_for_total(1).await;
    // Give a wrongly admitted second delivery time to land.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let stats_after: serde_json::Value = app
        .client()
        .get("/api/stats")
        .add_query_param("shop", SHOP)
        .await
        .json();

    assert_eq!(stats["totalImages"], 1);
    assert_eq!(stats_after["totalImages"], 1);
    assert_eq!(app.fetcher.calls(), 1);
}

#[tokio::test]
async fn test_duplicate_is_acknowledged_as_duplicate() {
    let app = setup_test_app();

    let send = || {
        app.client()
            .post("/api/webhooks/products/create")
            .add_query_param("shop", SHOP)
            .add_header("X-Shopify-Webhook-Id", "delivery-9")
            .json(&payload(&[]))
    };

    let first: serde_json::Value = send().await.json();
    let second: serde_json::Value = send().await.json();
    assert_eq!(first["status"], "accepted");
    assert_eq!(second["status"], "duplicate");
}

#[tokio::test]
async fn test_deliveries_without_id_are_not_deduplicated() {
    let app = setup_test_app();

    for _ in 0..2 {
        app.client()
            .post("/api/webhooks/products/create")
            .add_query_param("shop", SHOP)
            .json(&payload(&[GOOD_URL]))
            .await;
    }

    let stats = app.wait_for_total(2).await;
    assert_eq!(stats["totalImages"], 2);
}

#[tokio::test]
async fn test_malformed_payload_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/webhooks/products/create")
        .add_query_param("shop", SHOP)
        .text("not json")
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_webhook_requires_shop() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/webhooks/products/create")
        .json(&payload(&[GOOD_URL]))
        .await;

    assert_eq!(response.status_code(), 400);
    assert_eq!(app.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_redelivery_after_fault_counts_each_image_once() {
    let store: Arc<dyn KeyValueStore> = Arc::new(FlakyPolicyStore::default());
    let state = AppState::new(&Config::default(), store, UrlFetcher::catalog());
    let delivery = WebhookDelivery {
        topic: WebhookTopic::ProductsCreate,
        tenant_id: SHOP.to_string(),
        delivery_id: Some("delivery-f".to_string()),
        images: vec![GOOD_URL.to_string(), SMALL_URL.to_string()],
    };

    assert!(state.webhooks.admit(Some("delivery-f")).await);
    assert_eq!(state.webhooks.process(delivery.clone()).await, DeliveryOutcome::Failed);
    assert_eq!(state.stats.get(SHOP).await.unwrap().total_images, 1);

    // The failed delivery is retried by the platform.
    assert!(state.webhooks.admit(Some("delivery-f")).await);
    match state.webhooks.process(delivery).await {
        DeliveryOutcome::Processed { accepted, rejected } => assert_eq!(accepted + rejected, 1),
        other => panic!("expected processed outcome, got {:?}", other),
    }

    let stats = state.stats.get(SHOP).await.unwrap();
    assert_eq!(stats.total_images, 2);
    assert_eq!(stats.rejected_images, 1);
    assert!(!state.webhooks.admit(Some("delivery-f")).await);
}
