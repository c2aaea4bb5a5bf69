mod helpers;

use helpers::{setup_test_app, setup_test_app_with, GOOD_URL, SHOP};
use pixgate_core::{Config, SavingsBaseline};
use serde_json::json;

#[tokio::test]
async fn test_new_shop_reads_zeroed_stats() {
    let app = setup_test_app();

    let response = app
        .client()
        .get("/api/stats")
        .add_query_param("shop", SHOP)
        .await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["totalImages"], 0);
    assert_eq!(data["rejectedImages"], 0);
    assert_eq!(data["storageSaved"], "0 B");
    assert_eq!(data["averageSize"], "0 B");
}

#[tokio::test]
async fn test_accepted_image_formats_sizes() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/products")
        .add_query_param("shop", SHOP)
        .json(&json!({ "product": { "images": [{ "src": GOOD_URL }] } }))
        .await;
    assert_eq!(response.status_code(), 200);

    let data: serde_json::Value = app
        .client()
        .get("/api/stats")
        .add_query_param("shop", SHOP)
        .await
        .json();

    assert_eq!(data["totalImages"], 1);
    assert_eq!(data["rejectedImages"], 0);
    assert_eq!(data["averageSizeBytes"], 1_258_291);
    assert_eq!(data["averageSize"], "1.2 MB");
    // Default baseline is the policy maximum (2 MiB).
    assert_eq!(data["storageSavedBytes"], 2_097_152 - 1_258_291);
    assert_eq!(data["storageSaved"], "819.2 KB");
}

#[tokio::test]
async fn test_fixed_savings_baseline() {
    let mut config = Config::default();
    config.engine.savings_baseline = SavingsBaseline::Fixed(1_258_291);
    let app = setup_test_app_with(config);

    app.client()
        .post("/api/products")
        .add_query_param("shop", SHOP)
        .json(&json!({ "product": { "images": [{ "src": GOOD_URL }] } }))
        .await;

    let data: serde_json::Value = app
        .client()
        .get("/api/stats")
        .add_query_param("shop", SHOP)
        .await
        .json();
    assert_eq!(data["storageSavedBytes"], 0);
    assert_eq!(data["storageSaved"], "0 B");
}

#[tokio::test]
async fn test_stats_require_shop() {
    let app = setup_test_app();

    let response = app.client().get("/api/stats").await;

    assert_eq!(response.status_code(), 400);
}
