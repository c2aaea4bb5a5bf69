use pixgate_core::{ImageMetadata, Policy, RejectionKind, Verdict};

/// Applies a policy to probed metadata.
///
/// Checks run in a fixed order and stop at the first failure: minimum size, maximum
/// size, maximum dimension, minimum dimension. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, policy: &Policy, metadata: &ImageMetadata) -> Verdict {
        match first_violation(policy, metadata) {
            Some(kind) => Verdict::policy_rejection(kind, Some(*metadata)),
            None => Verdict::accepted(*metadata),
        }
    }
}

fn first_violation(policy: &Policy, metadata: &ImageMetadata) -> Option<RejectionKind> {
    let max_dim = policy.max_dimension_px;
    let min_dim = policy.min_dimension_px;

    if metadata.size_bytes < policy.min_bytes {
        Some(RejectionKind::BelowMinimumSize)
    } else if metadata.size_bytes > policy.max_bytes {
        Some(RejectionKind::ExceedsMaximumSize)
    } else if metadata.width_px > max_dim || metadata.height_px > max_dim {
        Some(RejectionKind::ExceedsMaximumDimension)
    } else if metadata.width_px < min_dim || metadata.height_px < min_dim {
        Some(RejectionKind::BelowMinimumDimension)
    } else {
        None
    }
}
