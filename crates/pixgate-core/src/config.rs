//! Configuration module
//!
//! Configuration is read once at startup and split into per-component sections that
//! are handed to each component's constructor. Nothing below the binary reads the
//! process environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::models::{Policy, PolicySettings, BYTES_PER_MB};
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 3000;
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
// Three attempts plus backoff (4s + 0.2s + 4s + 0.8s + 4s) must end before the deadline
const FETCH_TIMEOUT_MS: u64 = 4_000;
const FETCH_MAX_RESPONSE_MB: u64 = 25;
const FETCH_MAX_RETRIES: u32 = 2;
const FETCH_BACKOFF_BASE_MS: u64 = 200;
const FETCH_BACKOFF_MULTIPLIER: u32 = 4;
const VALIDATION_DEADLINE_MS: u64 = 15_000;
const MAX_CONCURRENT_FETCHES_PER_TENANT: usize = 4;
const WEBHOOK_DEDUP_TTL_SECS: u64 = 600;
const WEBHOOK_DEDUP_CAPACITY: usize = 10_000;

/// HTTP server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: String,
    pub max_request_body_bytes: usize,
    pub cors_origins: Vec<String>,
    /// Emit logs as JSON lines (`LOG_FORMAT=json`)
    pub log_json: bool,
    /// Include error details in API error bodies. Off in production unless overridden.
    pub expose_error_details: bool,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: SERVER_PORT,
            environment: "development".to_string(),
            max_request_body_bytes: MAX_REQUEST_BODY_BYTES,
            cors_origins: vec!["*".to_string()],
            log_json: false,
            expose_error_details: true,
        }
    }
}

/// Outbound image fetch settings
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Per-attempt timeout, covering connect and body download
    pub timeout: Duration,
    /// Hard cap on downloaded bytes, independent of any tenant policy
    pub max_response_bytes: u64,
    /// Additional attempts after the first one for transient failures
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_multiplier: u32,
    pub allow_private_ips: bool,
    pub host_allowlist: Option<Vec<String>>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
            max_response_bytes: FETCH_MAX_RESPONSE_MB * BYTES_PER_MB,
            max_retries: FETCH_MAX_RETRIES,
            backoff_base: Duration::from_millis(FETCH_BACKOFF_BASE_MS),
            backoff_multiplier: FETCH_BACKOFF_MULTIPLIER,
            allow_private_ips: false,
            host_allowlist: None,
            user_agent: format!("pixgate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetchConfig {
    /// Wait before retry `retry + 1`: `backoff_base * backoff_multiplier^retry`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = self.backoff_multiplier.saturating_pow(retry);
        self.backoff_base.saturating_mul(factor)
    }

    /// Longest a fetch can take when every attempt runs into its timeout.
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = self.timeout.saturating_mul(self.max_retries.saturating_add(1));
        (0..self.max_retries).fold(attempts, |total, retry| {
            total.saturating_add(self.backoff(retry))
        })
    }
}

/// Baseline used to credit "storage saved" for an accepted image.
///
/// The credited saving is `baseline - size_bytes`, clamped at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SavingsBaseline {
    /// The evaluated policy's `max_bytes`: headroom left under the tenant's cap
    PolicyMaxBytes,
    /// A fixed assumed pre-optimization size in bytes
    Fixed(u64),
}

impl SavingsBaseline {
    pub fn resolve(&self, policy: &Policy) -> u64 {
        match self {
            SavingsBaseline::PolicyMaxBytes => policy.max_bytes,
            SavingsBaseline::Fixed(bytes) => *bytes,
        }
    }
}

impl FromStr for SavingsBaseline {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        if value == "policy-max" {
            return Ok(SavingsBaseline::PolicyMaxBytes);
        }
        value
            .parse::<u64>()
            .map(SavingsBaseline::Fixed)
            .map_err(|_| {
                anyhow::anyhow!(
                    "Invalid savings baseline '{}': expected 'policy-max' or a byte count",
                    s
                )
            })
    }
}

/// Validation engine settings
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Overall budget for fetch, probe and evaluation of one image
    pub deadline: Duration,
    pub max_concurrent_fetches_per_tenant: usize,
    /// Reject on a declared `Content-Length` above the policy maximum without downloading
    pub content_length_fast_path: bool,
    pub savings_baseline: SavingsBaseline,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(VALIDATION_DEADLINE_MS),
            max_concurrent_fetches_per_tenant: MAX_CONCURRENT_FETCHES_PER_TENANT,
            content_length_fast_path: true,
            savings_baseline: SavingsBaseline::PolicyMaxBytes,
        }
    }
}

/// Webhook redelivery dedup settings
#[derive(Clone, Debug)]
pub struct DedupConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(WEBHOOK_DEDUP_TTL_SECS),
            capacity: WEBHOOK_DEDUP_CAPACITY,
        }
    }
}

/// Key-value store settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            local_path: None,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub engine: EngineConfig,
    pub dedup: DedupConfig,
    pub storage: StorageConfig,
    /// Policy served to tenants that never saved settings
    pub default_policy: Policy,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let default_settings = PolicySettings::default();

        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| defaults.server.environment.clone());

        let mut server = ServerConfig {
            port: parse_or(&lookup, "PORT", defaults.server.port)?,
            environment,
            max_request_body_bytes: parse_or(
                &lookup,
                "MAX_REQUEST_BODY_BYTES",
                defaults.server.max_request_body_bytes,
            )?,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.server.cors_origins),
            log_json: lookup("LOG_FORMAT")
                .map(|f| f.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            expose_error_details: false,
        };
        server.expose_error_details =
            parse_or(&lookup, "EXPOSE_ERROR_DETAILS", !server.is_production())?;

        let host_allowlist = lookup("FETCH_HOST_ALLOWLIST")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|hosts| !hosts.is_empty());

        let fetch = FetchConfig {
            timeout: Duration::from_millis(parse_or(
                &lookup,
                "FETCH_TIMEOUT_MS",
                FETCH_TIMEOUT_MS,
            )?),
            max_response_bytes: parse_or(
                &lookup,
                "FETCH_MAX_RESPONSE_BYTES",
                defaults.fetch.max_response_bytes,
            )?,
            max_retries: parse_or(&lookup, "FETCH_MAX_RETRIES", defaults.fetch.max_retries)?,
            backoff_base: Duration::from_millis(parse_or(
                &lookup,
                "FETCH_BACKOFF_BASE_MS",
                FETCH_BACKOFF_BASE_MS,
            )?),
            backoff_multiplier: defaults.fetch.backoff_multiplier,
            allow_private_ips: parse_or(&lookup, "FETCH_ALLOW_PRIVATE_IPS", false)?,
            host_allowlist,
            user_agent: lookup("FETCH_USER_AGENT").unwrap_or(defaults.fetch.user_agent),
        };

        let engine = EngineConfig {
            deadline: Duration::from_millis(parse_or(
                &lookup,
                "VALIDATION_DEADLINE_MS",
                VALIDATION_DEADLINE_MS,
            )?),
            max_concurrent_fetches_per_tenant: parse_or(
                &lookup,
                "MAX_CONCURRENT_FETCHES_PER_TENANT",
                defaults.engine.max_concurrent_fetches_per_tenant,
            )?,
            content_length_fast_path: parse_or(&lookup, "CONTENT_LENGTH_FAST_PATH", true)?,
            savings_baseline: parse_or(
                &lookup,
                "SAVINGS_BASELINE",
                defaults.engine.savings_baseline,
            )?,
        };

        let dedup = DedupConfig {
            ttl: Duration::from_secs(parse_or(
                &lookup,
                "WEBHOOK_DEDUP_TTL_SECS",
                WEBHOOK_DEDUP_TTL_SECS,
            )?),
            capacity: parse_or(&lookup, "WEBHOOK_DEDUP_CAPACITY", defaults.dedup.capacity)?,
        };

        let storage = StorageConfig {
            backend: parse_or(&lookup, "STORAGE_BACKEND", defaults.storage.backend)?,
            local_path: lookup("LOCAL_STORAGE_PATH"),
        };

        let default_policy = PolicySettings {
            min_size_kb: parse_or(&lookup, "DEFAULT_MIN_SIZE_KB", default_settings.min_size_kb)?,
            max_size_mb: parse_or(&lookup, "DEFAULT_MAX_SIZE_MB", default_settings.max_size_mb)?,
            min_dimension: parse_or(
                &lookup,
                "DEFAULT_MIN_DIMENSION",
                default_settings.min_dimension,
            )?,
            max_dimension: parse_or(
                &lookup,
                "DEFAULT_MAX_DIMENSION",
                default_settings.max_dimension,
            )?,
            compression_quality: parse_or(
                &lookup,
                "DEFAULT_COMPRESSION_QUALITY",
                default_settings.compression_quality,
            )?,
            auto_optimize: parse_or(&lookup, "DEFAULT_AUTO_OPTIMIZE", false)?,
        }
        .to_policy();

        Ok(Self {
            server,
            fetch,
            engine,
            dedup,
            storage,
            default_policy,
        })
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.default_policy
            .validate()
            .map_err(|e| anyhow::anyhow!("Default policy is invalid: {}", e))?;

        if self.fetch.max_response_bytes == 0 {
            return Err(anyhow::anyhow!(
                "FETCH_MAX_RESPONSE_BYTES must be greater than zero"
            ));
        }

        if self.fetch.timeout.is_zero() || self.engine.deadline.is_zero() {
            return Err(anyhow::anyhow!(
                "FETCH_TIMEOUT_MS and VALIDATION_DEADLINE_MS must be greater than zero"
            ));
        }

        // Otherwise a host that keeps timing out is reported as a deadline timeout
        // instead of a fetch failure.
        let fetch_budget = self.fetch.worst_case_duration();
        if fetch_budget >= self.engine.deadline {
            return Err(anyhow::anyhow!(
                "Fetch attempts can take {}ms in total, which does not fit under VALIDATION_DEADLINE_MS ({}ms); lower FETCH_TIMEOUT_MS or FETCH_MAX_RETRIES",
                fetch_budget.as_millis(),
                self.engine.deadline.as_millis()
            ));
        }

        if self.engine.max_concurrent_fetches_per_tenant == 0 {
            return Err(anyhow::anyhow!(
                "MAX_CONCURRENT_FETCHES_PER_TENANT must be at least 1"
            ));
        }

        if self.dedup.capacity == 0 {
            return Err(anyhow::anyhow!("WEBHOOK_DEDUP_CAPACITY must be at least 1"));
        }

        if self.storage.backend == StorageBackend::Local && self.storage.local_path.is_none() {
            return Err(anyhow::anyhow!(
                "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH to be set"
            ));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
