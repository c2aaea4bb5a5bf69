//! Validation orchestration: fetch, probe, evaluate, record

use std::sync::Arc;

use futures::future::join_all;
use pixgate_core::{EngineConfig, ImageRef, Policy, RejectionKind, Verdict};
use pixgate_infra::{AssetFetcher, FetchError, FetchLimits, TenantLimiter};
use pixgate_processing::{MetadataProbe, PolicyEvaluator};
use pixgate_storage::StorageError;

use super::policy_store::PolicyStore;
use super::stats::StatsAggregator;

/// System faults. Image problems are never errors; they come back as failing verdicts.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to load policy for tenant {tenant_id}: {source}")]
    PolicyUnavailable {
        tenant_id: String,
        #[source]
        source: StorageError,
    },

    #[error("Validation task failed: {0}")]
    Internal(String),
}

/// Validates one image at a time against its tenant's current policy.
///
/// The engine keeps no per-call state: every call reads the tenant's policy afresh
/// and writes its verdict through to the stats aggregator. Fetch, probe and
/// evaluation together run under `EngineConfig::deadline`; the policy read and the
/// stats write are outside it.
pub struct ValidationEngine {
    policies: Arc<PolicyStore>,
    stats: Arc<StatsAggregator>,
    fetcher: Arc<dyn AssetFetcher>,
    limiter: TenantLimiter,
    probe: MetadataProbe,
    evaluator: PolicyEvaluator,
    config: EngineConfig,
}

impl ValidationEngine {
    pub fn new(
        policies: Arc<PolicyStore>,
        stats: Arc<StatsAggregator>,
        fetcher: Arc<dyn AssetFetcher>,
        config: EngineConfig,
    ) -> Self {
        Self {
            policies,
            stats,
            fetcher,
            limiter: TenantLimiter::new(config.max_concurrent_fetches_per_tenant),
            probe: MetadataProbe::new(),
            evaluator: PolicyEvaluator::new(),
            config,
        }
    }

    #[tracing::instrument(
        skip_all,
        fields(
            tenant_id = %image.tenant_id,
            url = %image.url,
            source_event_id = ?image.source_event_id
        )
    )]
    pub async fn validate(&self, image: &ImageRef) -> Result<Verdict, EngineError> {
        let policy = self.policies.get(&image.tenant_id).await.map_err(|source| {
            tracing::error!(error = %source, "Policy read failed");
            EngineError::PolicyUnavailable {
                tenant_id: image.tenant_id.clone(),
                source,
            }
        })?;

        let verdict = match tokio::time::timeout(self.config.deadline, self.inspect(image, &policy)).await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    deadline_ms = self.config.deadline.as_millis() as u64,
                    "Validation deadline exceeded"
                );
                Verdict::timeout()
            }
        };

        let baseline = self.config.savings_baseline.resolve(&policy);
        if let Err(e) = self.stats.record(&image.tenant_id, &verdict, baseline).await {
            tracing::error!(error = %e, "Failed to record validation stats");
        }

        match (&verdict.reason, verdict.metadata) {
            (None, Some(metadata)) => tracing::info!(
                width = metadata.width_px,
                height = metadata.height_px,
                size_bytes = metadata.size_bytes,
                "Image accepted"
            ),
            (reason, _) => tracing::info!(
                reason = reason.as_deref().unwrap_or_default(),
                rejection = ?verdict.rejection,
                "Image rejected"
            ),
        }

        Ok(verdict)
    }

    /// Validate several images concurrently. Results are in input order.
    pub async fn validate_all(&self, images: &[ImageRef]) -> Vec<Result<Verdict, EngineError>> {
        join_all(images.iter().map(|image| self.validate(image))).await
    }

    async fn inspect(&self, image: &ImageRef, policy: &Policy) -> Result<Verdict, EngineError> {
        let limits = if self.config.content_length_fast_path {
            FetchLimits::reject_above(policy.max_bytes)
        } else {
            FetchLimits::default()
        };

        let bytes = {
            let _permit = self
                .limiter
                .acquire(&image.tenant_id)
                .await
                .map_err(|e| EngineError::Internal(format!("fetch limiter closed: {}", e)))?;

            match self.fetcher.fetch(&image.url, limits).await {
                Ok(bytes) => bytes,
                Err(FetchError::ExceedsPolicy { content_length }) => {
                    tracing::debug!(content_length = content_length, "Rejected on declared length");
                    return Ok(Verdict::policy_rejection(
                        RejectionKind::ExceedsMaximumSize,
                        None,
                    ));
                }
                Err(e) => {
                    return Ok(Verdict::rejected(
                        RejectionKind::FetchFailed,
                        format!("fetch failed: {}", e),
                        None,
                    ))
                }
            }
        };

        let probe = self.probe;
        let probed = tokio::task::spawn_blocking(move || probe.probe(&bytes))
            .await
            .map_err(|e| EngineError::Internal(format!("probe task failed: {}", e)))?;

        match probed {
            Ok(metadata) => Ok(self.evaluator.evaluate(policy, &metadata)),
            Err(e) => Ok(Verdict::rejected(e.rejection_kind(), e.to_string(), None)),
        }
    }
}
