mod helpers;

use helpers::{setup_test_app_with, HUGE_URL, SHOP};
use pixgate_core::Config;
use serde_json::json;

#[tokio::test]
async fn test_production_hides_error_details() {
    let mut config = Config::default();
    config.server.expose_error_details = false;
    let app = setup_test_app_with(config);

    let response = app
        .client()
        .post("/api/products")
        .add_query_param("shop", SHOP)
        .json(&json!({ "product": { "images": [{ "src": HUGE_URL }] } }))
        .await;

    assert_eq!(response.status_code(), 400);
    let data: serde_json::Value = response.json();
    assert_eq!(data["error"], "exceeds maximum size");
    assert_eq!(data["code"], "IMAGE_REJECTED");
    assert!(data.get("details").is_none());
    assert!(data.get("error_type").is_none());
    assert!(data["request_id"].is_string());
}
