use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use pixgate_core::FetchConfig;
use reqwest::{redirect, Client, Url};

use super::ssrf::PublicOnlyResolver;
use super::{AssetFetcher, FetchError, FetchLimits, UrlGuard};

const MAX_REDIRECTS: usize = 5;

/// HTTP(S) fetcher with bounded retries and response size caps.
///
/// Each attempt is bounded by `FetchConfig::timeout`. Transient failures are retried
/// up to `max_retries` more times, waiting `backoff_base * backoff_multiplier^n`
/// before retry `n + 1`. The response body is streamed and abandoned as soon as it
/// crosses `max_response_bytes`.
pub struct HttpAssetFetcher {
    client: Client,
    guard: UrlGuard,
    config: FetchConfig,
}

impl HttpAssetFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let guard = UrlGuard::new(config.allow_private_ips, config.host_allowlist.clone());

        let redirect_guard = guard.clone();
        let redirect_policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error(format!("more than {} redirects", MAX_REDIRECTS));
            }
            match redirect_guard.check_static(attempt.url().as_str()) {
                Ok(_) => attempt.follow(),
                Err(e) => attempt.error(e),
            }
        });

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(redirect_policy);
        if !guard.allows_private_ips() {
            builder = builder.dns_resolver(Arc::new(PublicOnlyResolver));
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            guard,
            config,
        })
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.config.backoff(retry)
    }

    async fn fetch_once(&self, url: &Url, limits: FetchLimits) -> Result<Bytes, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let cap = self.config.max_response_bytes;
        let declared = response.content_length();
        if let Some(length) = declared {
            if length > cap {
                return Err(FetchError::TooLarge { limit: cap });
            }
            if let Some(limit) = limits.reject_above {
                if length > limit {
                    return Err(FetchError::ExceedsPolicy {
                        content_length: length,
                    });
                }
            }
        }

        let mut body = BytesMut::with_capacity(declared.unwrap_or(0) as usize);
        while let Some(chunk) = response.chunk().await.map_err(classify_error)? {
            if (body.len() + chunk.len()) as u64 > cap {
                return Err(FetchError::TooLarge { limit: cap });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    #[tracing::instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str, limits: FetchLimits) -> Result<Bytes, FetchError> {
        let parsed = self.guard.check(url).await.map_err(|e| {
            tracing::warn!(error = %e, "Image URL rejected before fetch");
            e
        })?;

        let mut retry = 0;
        loop {
            match self.fetch_once(&parsed, limits).await {
                Ok(bytes) => {
                    tracing::debug!(size_bytes = bytes.len(), attempts = retry + 1, "Image fetched");
                    return Ok(bytes);
                }
                Err(e) if e.is_retryable() && retry < self.config.max_retries => {
                    let delay = self.backoff(retry);
                    tracing::warn!(
                        error = %e,
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Image fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, attempts = retry + 1, "Image fetch failed");
                    return Err(e);
                }
            }
        }
    }
}

/// A guard refusal raised inside the client's resolver, if that is what failed.
fn guard_refusal(err: &reqwest::Error) -> Option<FetchError> {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(refusal) = cause.downcast_ref::<FetchError>() {
            return Some(refusal.clone());
        }
        source = cause.source();
    }
    None
}

fn classify_error(err: reqwest::Error) -> FetchError {
    if let Some(refusal) = guard_refusal(&err) {
        refusal
    } else if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_redirect() {
        FetchError::Request(err.to_string())
    } else if err.is_builder() {
        FetchError::InvalidUrl(err.to_string())
    } else if err.is_body() || err.is_decode() {
        FetchError::Body(err.to_string())
    } else {
        // connect refused, reset mid-request and similar transport failures
        FetchError::Connect(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let fetcher = HttpAssetFetcher::new(FetchConfig::default()).unwrap();
        assert_eq!(fetcher.backoff(0), Duration::from_millis(200));
        assert_eq!(fetcher.backoff(1), Duration::from_millis(800));
    }
}
