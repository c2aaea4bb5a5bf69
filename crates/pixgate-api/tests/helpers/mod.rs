//! Test helpers: build AppState and router for integration tests.
//!
//! Images are served by an in-process fetcher keyed by URL, so no network is used.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};
use pixgate_api::setup::routes;
use pixgate_api::AppState;
use pixgate_core::Config;
use pixgate_services::{AssetFetcher, FetchError, FetchLimits, KeyValueStore, MemoryStore};
use serde_json::Value;

pub const SHOP: &str = "demo.myshopify.com";
pub const SMALL_URL: &str = "https://cdn.example.com/small.png";
pub const GOOD_URL: &str = "https://cdn.example.com/good.png";
pub const HUGE_URL: &str = "https://cdn.example.com/huge.png";
pub const MISSING_URL: &str = "https://cdn.example.com/missing.png";

/// PNG of the given dimensions padded with trailing zeros to `total_size` bytes.
pub fn png(width: u32, height: u32, total_size: usize) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    let mut bytes = out.into_inner();
    assert!(bytes.len() <= total_size, "fixture larger than requested size");
    bytes.resize(total_size, 0);
    Bytes::from(bytes)
}

/// Serves fixed bodies by URL; unknown URLs answer 404.
pub struct UrlFetcher {
    bodies: HashMap<String, Bytes>,
    calls: AtomicUsize,
}

impl UrlFetcher {
    pub fn catalog() -> Arc<Self> {
        let mut bodies = HashMap::new();
        bodies.insert(SMALL_URL.to_string(), png(100, 100, 1024 * 1024));
        bodies.insert(GOOD_URL.to_string(), png(1000, 800, 1_258_291));
        bodies.insert(HUGE_URL.to_string(), png(3000, 2000, 5_767_168));
        Arc::new(Self {
            bodies,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetFetcher for UrlFetcher {
    async fn fetch(&self, url: &str, limits: FetchLimits) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self
            .bodies
            .get(url)
            .cloned()
            .ok_or(FetchError::Status { status: 404 })?;

        if let Some(limit) = limits.reject_above {
            if body.len() as u64 > limit {
                return Err(FetchError::ExceedsPolicy {
                    content_length: body.len() as u64,
                });
            }
        }
        Ok(body)
    }
}

/// Test application: server plus handles on the in-process dependencies.
pub struct TestApp {
    pub server: TestServer,
    pub fetcher: Arc<UrlFetcher>,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Poll the stats endpoint until `totalImages` reaches `expected` or a second passes.
    pub async fn wait_for_total(&self, expected: u64) -> Value {
        let mut stats = Value::Null;
        for _ in 0..50 {
            stats = self
                .server
                .get("/api/stats")
                .add_query_param("shop", SHOP)
                .await
                .json();
            if stats["totalImages"].as_u64() >= Some(expected) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        stats
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(Config::default())
}

pub fn setup_test_app_with(config: Config) -> TestApp {
    let fetcher = UrlFetcher::catalog();
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(
        &config,
        store.clone() as Arc<dyn KeyValueStore>,
        fetcher.clone(),
    ));
    let app = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        fetcher,
        store,
    }
}
