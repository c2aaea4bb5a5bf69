//! Product webhook adapter
//!
//! Webhook deliveries are at-least-once and may arrive concurrently or out of order.
//! `DeliveryDeduplicator` is a bounded, time-expiring seen-set keyed by delivery id;
//! `WebhookProcessor` fans a delivery's images out to the engine and keeps per-image
//! marks so that a retried delivery does not count finished images twice.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use pixgate_core::{DedupConfig, ImageRef};
use pixgate_services::ValidationEngine;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Seen-set of webhook delivery ids.
///
/// Entries expire after the configured TTL; when full, the least recently marked
/// id is evicted.
pub struct DeliveryDeduplicator {
    ttl: Duration,
    seen: Mutex<LruCache<String, Instant>>,
}

impl DeliveryDeduplicator {
    pub fn new(config: &DedupConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            ttl: config.ttl,
            seen: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Mark `delivery_id` as seen. Returns `false` if it was already seen and not expired.
    pub async fn check_and_mark(&self, delivery_id: &str) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().await;

        if let Some(marked_at) = seen.peek(delivery_id) {
            if now.duration_since(*marked_at) < self.ttl {
                return false;
            }
        }

        seen.put(delivery_id.to_string(), now);
        true
    }

    /// Drop a mark so that a redelivery is processed again.
    pub async fn forget(&self, delivery_id: &str) {
        self.seen.lock().await.pop(delivery_id);
    }

    /// Whether `key` holds an unexpired mark. Does not touch recency.
    pub async fn is_marked(&self, key: &str) -> bool {
        let seen = self.seen.lock().await;
        seen.peek(key)
            .is_some_and(|marked_at| marked_at.elapsed() < self.ttl)
    }

    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookTopic {
    ProductsCreate,
    ProductsUpdate,
}

impl Display for WebhookTopic {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WebhookTopic::ProductsCreate => write!(f, "products/create"),
            WebhookTopic::ProductsUpdate => write!(f, "products/update"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookImage {
    src: Option<String>,
}

/// Product payload as delivered by the platform; only the image list matters here.
#[derive(Debug, Deserialize)]
pub struct ProductPayload {
    #[serde(default)]
    images: Vec<WebhookImage>,
}

impl ProductPayload {
    /// Image URLs in payload order. Entries without a `src` are skipped.
    pub fn image_urls(&self) -> Vec<String> {
        self.images
            .iter()
            .filter_map(|image| image.src.as_deref())
            .map(str::trim)
            .filter(|src| !src.is_empty())
            .map(String::from)
            .collect()
    }
}

/// One webhook delivery, normalized by the listener.
#[derive(Debug, Clone)]
pub struct WebhookDelivery {
    pub topic: WebhookTopic,
    pub tenant_id: String,
    pub delivery_id: Option<String>,
    pub images: Vec<String>,
}

impl WebhookDelivery {
    fn image_refs(&self) -> Vec<ImageRef> {
        self.images
            .iter()
            .map(|url| {
                let image = ImageRef::new(url.clone(), self.tenant_id.clone());
                match &self.delivery_id {
                    Some(id) => image.with_source_event(id.clone()),
                    None => image,
                }
            })
            .collect()
    }
}

fn image_mark(delivery_id: &str, index: usize, url: &str) -> String {
    format!("{}#{}:{}", delivery_id, index, url)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Duplicate,
    Processed { accepted: usize, rejected: usize },
    Failed,
}

#[derive(Clone)]
pub struct WebhookProcessor {
    engine: Arc<ValidationEngine>,
    dedup: Arc<DeliveryDeduplicator>,
}

impl WebhookProcessor {
    pub fn new(engine: Arc<ValidationEngine>, dedup: Arc<DeliveryDeduplicator>) -> Self {
        Self { engine, dedup }
    }

    /// Claim a delivery id. Deliveries without an id are always admitted.
    pub async fn admit(&self, delivery_id: Option<&str>) -> bool {
        match delivery_id {
            Some(id) => self.dedup.check_and_mark(id).await,
            None => true,
        }
    }

    /// Validate every image of an admitted delivery.
    ///
    /// When any image fails, the delivery mark is released so the platform's retry
    /// is admitted, and each image that did complete keeps its own mark. The retry
    /// then validates only the images without one.
    #[tracing::instrument(
        skip_all,
        fields(topic = %delivery.topic, tenant_id = %delivery.tenant_id, delivery_id = ?delivery.delivery_id)
    )]
    pub async fn process(&self, delivery: WebhookDelivery) -> DeliveryOutcome {
        let mut pending = Vec::new();
        for (index, image) in delivery.image_refs().into_iter().enumerate() {
            let key = delivery
                .delivery_id
                .as_deref()
                .map(|id| image_mark(id, index, &image.url));
            if let Some(key) = &key {
                if self.dedup.is_marked(key).await {
                    tracing::debug!(url = %image.url, "Image already validated by an earlier attempt");
                    continue;
                }
            }
            pending.push((key, image));
        }

        let images: Vec<ImageRef> = pending.iter().map(|(_, image)| image.clone()).collect();
        let results = self.engine.validate_all(&images).await;

        let mut accepted = 0;
        let mut rejected = 0;
        let mut failed = false;
        let mut completed = Vec::new();

        for ((key, image), result) in pending.into_iter().zip(results) {
            match result {
                Ok(verdict) => {
                    if verdict.valid {
                        accepted += 1;
                    } else {
                        rejected += 1;
                        tracing::warn!(
                            url = %image.url,
                            reason = verdict.reason.as_deref().unwrap_or_default(),
                            "Product image rejected"
                        );
                    }
                    completed.extend(key);
                }
                Err(e) => {
                    failed = true;
                    tracing::error!(url = %image.url, error = %e, "Failed to validate product image");
                }
            }
        }

        if failed {
            if let Some(id) = &delivery.delivery_id {
                for key in &completed {
                    self.dedup.check_and_mark(key).await;
                }
                self.dedup.forget(id).await;
            }
            return DeliveryOutcome::Failed;
        }

        tracing::info!(accepted, rejected, "Webhook delivery processed");
        DeliveryOutcome::Processed { accepted, rejected }
    }

    pub fn deduplicator(&self) -> &DeliveryDeduplicator {
        &self.dedup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dedup(ttl: Duration, capacity: usize) -> DeliveryDeduplicator {
        DeliveryDeduplicator::new(&DedupConfig { ttl, capacity })
    }

    #[tokio::test]
    async fn test_second_mark_is_duplicate() {
        let dedup = dedup(Duration::from_secs(60), 16);
        assert!(dedup.check_and_mark("evt-1").await);
        assert!(!dedup.check_and_mark("evt-1").await);
        assert!(dedup.check_and_mark("evt-2").await);
        assert_eq!(dedup.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_mark_is_admitted_again() {
        let dedup = dedup(Duration::from_millis(20), 16);
        assert!(dedup.check_and_mark("evt-1").await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(dedup.check_and_mark("evt-1").await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let dedup = dedup(Duration::from_secs(60), 2);
        assert!(dedup.check_and_mark("a").await);
        assert!(dedup.check_and_mark("b").await);
        assert!(dedup.check_and_mark("c").await);
        assert_eq!(dedup.len().await, 2);
        assert!(dedup.check_and_mark("a").await);
    }

    #[tokio::test]
    async fn test_forget_releases_mark() {
        let dedup = dedup(Duration::from_secs(60), 16);
        assert!(dedup.check_and_mark("evt-1").await);
        dedup.forget("evt-1").await;
        assert!(dedup.is_empty().await);
        assert!(dedup.check_and_mark("evt-1").await);
    }

    #[tokio::test]
    async fn test_is_marked_respects_ttl() {
        let dedup = dedup(Duration::from_millis(20), 16);
        assert!(!dedup.is_marked("evt-1#0:https://cdn.example.com/a.png").await);
        dedup.check_and_mark("evt-1#0:https://cdn.example.com/a.png").await;
        assert!(dedup.is_marked("evt-1#0:https://cdn.example.com/a.png").await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!dedup.is_marked("evt-1#0:https://cdn.example.com/a.png").await);
    }

    #[tokio::test]
    async fn test_zero_capacity_still_tracks_one() {
        let dedup = dedup(Duration::from_secs(60), 0);
        assert!(dedup.check_and_mark("evt-1").await);
        assert!(!dedup.check_and_mark("evt-1").await);
    }

    #[test]
    fn test_payload_image_urls() {
        let payload: ProductPayload = serde_json::from_str(
            r#"{"id": 1, "images": [{"src": "https://cdn.example.com/a.png"}, {"alt": "x"}, {"src": " "}]}"#,
        )
        .unwrap();
        assert_eq!(payload.image_urls(), vec!["https://cdn.example.com/a.png"]);

        let empty: ProductPayload = serde_json::from_str(r#"{"id": 2}"#).unwrap();
        assert!(empty.image_urls().is_empty());
    }

    #[test]
    fn test_delivery_carries_source_event() {
        let delivery = WebhookDelivery {
            topic: WebhookTopic::ProductsCreate,
            tenant_id: "shop.example.com".to_string(),
            delivery_id: Some("evt-9".to_string()),
            images: vec!["https://cdn.example.com/a.png".to_string()],
        };
        let refs = delivery.image_refs();
        assert_eq!(refs[0].source_event_id.as_deref(), Some("evt-9"));
        assert_eq!(refs[0].tenant_id, "shop.example.com");
        assert_eq!(WebhookTopic::ProductsUpdate.to_string(), "products/update");
    }
}
