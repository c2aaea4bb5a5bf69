mod helpers;

use helpers::{setup_test_app, SHOP};
use serde_json::json;

#[tokio::test]
async fn test_get_settings_returns_defaults() {
    let app = setup_test_app();

    let response = app
        .client()
        .get("/api/settings")
        .add_query_param("shop", SHOP)
        .await;

    assert_eq!(response.status_code(), 200);
    let data: serde_json::Value = response.json();
    assert_eq!(data["minSizeKB"], 0.0);
    assert_eq!(data["maxSizeMB"], 2.0);
    assert_eq!(data["minDimension"], 200);
    assert_eq!(data["maxDimension"], 2048);
    assert_eq!(data["compressionQuality"], 80);
    assert_eq!(data["autoOptimize"], false);
}

#[tokio::test]
async fn test_update_settings_round_trips() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/settings")
        .add_header("X-Shopify-Shop-Domain", SHOP)
        .json(&json!({
            "minSizeKB": 10,
            "maxSizeMB": 5,
            "minDimension": 300,
            "maxDimension": 4000,
            "compressionQuality": 70,
            "autoOptimize": true
        }))
        .await;
    assert_eq!(response.status_code(), 200);
    let saved: serde_json::Value = response.json();
    assert_eq!(saved["maxSizeMB"], 5.0);

    let data: serde_json::Value = app
        .client()
        .get("/api/settings")
        .add_query_param("shop", SHOP)
        .await
        .json();
    assert_eq!(data["minSizeKB"], 10.0);
    assert_eq!(data["maxDimension"], 4000);
    assert_eq!(data["autoOptimize"], true);
}

#[tokio::test]
async fn test_inverted_bounds_rejected_and_prior_policy_kept() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/settings")
        .add_query_param("shop", SHOP)
        .json(&json!({ "minDimension": 1000, "maxDimension": 500 }))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_POLICY");
    assert!(data["error"].as_str().unwrap().contains("minimum dimension"));
    assert!(data["request_id"].is_string());

    let current: serde_json::Value = app
        .client()
        .get("/api/settings")
        .add_query_param("shop", SHOP)
        .await
        .json();
    assert_eq!(current["minDimension"], 200);
    assert_eq!(current["maxDimension"], 2048);
}

#[tokio::test]
async fn test_out_of_range_quality_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/settings")
        .add_query_param("shop", SHOP)
        .json(&json!({ "compressionQuality": 150 }))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_malformed_body_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post("/api/settings")
        .add_query_param("shop", SHOP)
        .text("{not json")
        .content_type("application/json")
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_missing_shop_is_rejected() {
    let app = setup_test_app();

    let response = app.client().get("/api/settings").await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "Shop parameter missing");
    assert_eq!(data["code"], "MISSING_TENANT");
}

#[tokio::test]
async fn test_settings_are_per_shop() {
    let app = setup_test_app();

    app.client()
        .post("/api/settings")
        .add_query_param("shop", "a.myshopify.com")
        .json(&json!({ "maxDimension": 1024 }))
        .await;

    let other: serde_json::Value = app
        .client()
        .get("/api/settings")
        .add_query_param("shop", "b.myshopify.com")
        .await
        .json();
    assert_eq!(other["maxDimension"], 2048);
}
