/// Shop domain header sent by the catalog platform on admin requests and webhooks
pub const SHOP_DOMAIN_HEADER: &str = "X-Shopify-Shop-Domain";

/// Unique id of one webhook delivery; redeliveries reuse it
pub const WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";

pub const WEBHOOK_TOPIC_HEADER: &str = "X-Shopify-Topic";

pub const PRODUCTS_PATH: &str = "/api/products";
