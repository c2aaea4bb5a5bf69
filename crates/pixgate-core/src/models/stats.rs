use serde::{Deserialize, Serialize};

use super::verdict::{RejectionCategory, Verdict};

/// Cumulative validation counters for one tenant.
///
/// The running average is derived from `accepted_bytes_total` so that every stored
/// field is an exact integer counter and concurrent folds stay lossless.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_images: u64,
    pub rejected_images: u64,
    pub storage_saved_bytes: u64,
    pub accepted_bytes_total: u64,
    pub policy_rejections: u64,
    pub fetch_failures: u64,
    pub decode_failures: u64,
    pub timeouts: u64,
}

impl Stats {
    pub fn accepted_images(&self) -> u64 {
        self.total_images.saturating_sub(self.rejected_images)
    }

    /// Mean byte size of accepted images, 0 when none were accepted.
    pub fn average_size_bytes(&self) -> u64 {
        match self.accepted_images() {
            0 => 0,
            accepted => self.accepted_bytes_total / accepted,
        }
    }

    /// Fold one verdict into the counters.
    ///
    /// `baseline_bytes` is the assumed pre-optimization size of an accepted image;
    /// the saving credited is `baseline_bytes - size`, clamped at zero.
    pub fn apply(&mut self, verdict: &Verdict, baseline_bytes: u64) {
        self.total_images += 1;

        if !verdict.valid {
            self.rejected_images += 1;
            match verdict.rejection.map(|kind| kind.category()) {
                Some(RejectionCategory::Fetch) => self.fetch_failures += 1,
                Some(RejectionCategory::Decode) => self.decode_failures += 1,
                Some(RejectionCategory::Timeout) => self.timeouts += 1,
                Some(RejectionCategory::Policy) | None => self.policy_rejections += 1,
            }
            return;
        }

        if let Some(metadata) = verdict.metadata {
            self.accepted_bytes_total += metadata.size_bytes;
            self.storage_saved_bytes += baseline_bytes.saturating_sub(metadata.size_bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImageFormatKind, ImageMetadata, RejectionKind};

    fn accepted(size_bytes: u64) -> Verdict {
        Verdict::accepted(ImageMetadata {
            width_px: 800,
            height_px: 600,
            size_bytes,
            format: ImageFormatKind::Jpeg,
        })
    }

    #[test]
    fn test_apply_accepted_folds_average_and_savings() {
        let mut stats = Stats::default();
        stats.apply(&accepted(1_000), 3_000);
        stats.apply(&accepted(2_000), 3_000);

        assert_eq!(stats.total_images, 2);
        assert_eq!(stats.rejected_images, 0);
        assert_eq!(stats.average_size_bytes(), 1_500);
        assert_eq!(stats.storage_saved_bytes, 3_000);
    }

    #[test]
    fn test_savings_clamped_at_zero() {
        let mut stats = Stats::default();
        stats.apply(&accepted(5_000), 3_000);
        assert_eq!(stats.storage_saved_bytes, 0);
        assert_eq!(stats.average_size_bytes(), 5_000);
    }

    #[test]
    fn test_apply_rejections_by_category() {
        let mut stats = Stats::default();
        stats.apply(
            &Verdict::policy_rejection(RejectionKind::ExceedsMaximumSize, None),
            0,
        );
        stats.apply(
            &Verdict::rejected(RejectionKind::FetchFailed, "fetch failed: timeout", None),
            0,
        );
        stats.apply(
            &Verdict::rejected(RejectionKind::CorruptImage, "corrupt image", None),
            0,
        );
        stats.apply(&Verdict::timeout(), 0);

        assert_eq!(stats.total_images, 4);
        assert_eq!(stats.rejected_images, 4);
        assert_eq!(stats.policy_rejections, 1);
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(stats.decode_failures, 1);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.average_size_bytes(), 0);
        assert_eq!(stats.storage_saved_bytes, 0);
    }

    #[test]
    fn test_deserialize_partial_record() {
        let stats: Stats = serde_json::from_str(r#"{"totalImages": 3}"#).unwrap();
        assert_eq!(stats.total_images, 3);
        assert_eq!(stats.rejected_images, 0);
    }
}
