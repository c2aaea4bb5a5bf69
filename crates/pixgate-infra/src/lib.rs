//! Pixgate Infrastructure Library
//!
//! Shared infrastructure used by the validation services and the HTTP surface:
//! - Outbound image fetching (retry, size caps, SSRF guard)
//! - Per-tenant fetch concurrency limits
//! - Request ID middleware
//! - Telemetry initialization

pub mod fetch;
pub mod limiter;
pub mod middleware;
pub mod telemetry;

// Re-export commonly used types
pub use fetch::{AssetFetcher, FetchError, FetchLimits, HttpAssetFetcher, UrlGuard};
pub use limiter::TenantLimiter;
pub use middleware::{get_request_id, request_id_middleware, RequestId};
pub use telemetry::init_telemetry;
