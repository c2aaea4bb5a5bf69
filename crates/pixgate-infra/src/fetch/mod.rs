//! Outbound image retrieval

mod http;
mod ssrf;

pub use http::HttpAssetFetcher;
pub use ssrf::UrlGuard;

use async_trait::async_trait;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("timeout")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("response body interrupted: {0}")]
    Body(String),

    #[error("response larger than {limit} bytes")]
    TooLarge { limit: u64 },

    /// Declared `Content-Length` is above the caller's policy maximum
    #[error("declared size of {content_length} bytes exceeds the policy maximum")]
    ExceedsPolicy { content_length: u64 },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("url not allowed: {0}")]
    Blocked(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Connection failures, timeouts, interrupted bodies and 5xx responses are worth
    /// another attempt; everything else fails the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Connect(_) | FetchError::Body(_) => true,
            FetchError::Status { status } => *status >= 500,
            _ => false,
        }
    }
}

/// Per-call limits supplied by the caller on top of the fetcher's own caps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchLimits {
    /// Fail with `ExceedsPolicy` when the declared length is above this, before reading the body
    pub reject_above: Option<u64>,
}

impl FetchLimits {
    pub fn reject_above(bytes: u64) -> Self {
        Self {
            reject_above: Some(bytes),
        }
    }
}

/// Retrieves the raw bytes behind an image URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str, limits: FetchLimits) -> Result<Bytes, FetchError>;
}
