use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::image::ImageMetadata;

/// Why a verdict failed. The first four are policy checks, evaluated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    BelowMinimumSize,
    ExceedsMaximumSize,
    ExceedsMaximumDimension,
    BelowMinimumDimension,
    FetchFailed,
    UnsupportedFormat,
    CorruptImage,
    Timeout,
}

/// Coarse outcome taxonomy used by the stats counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCategory {
    Policy,
    Fetch,
    Decode,
    Timeout,
}

impl RejectionKind {
    pub fn category(self) -> RejectionCategory {
        match self {
            RejectionKind::BelowMinimumSize
            | RejectionKind::ExceedsMaximumSize
            | RejectionKind::ExceedsMaximumDimension
            | RejectionKind::BelowMinimumDimension => RejectionCategory::Policy,
            RejectionKind::FetchFailed => RejectionCategory::Fetch,
            RejectionKind::UnsupportedFormat | RejectionKind::CorruptImage => {
                RejectionCategory::Decode
            }
            RejectionKind::Timeout => RejectionCategory::Timeout,
        }
    }

    /// Fixed reason text for policy and timeout rejections.
    pub fn reason(self) -> &'static str {
        match self {
            RejectionKind::BelowMinimumSize => "below minimum size",
            RejectionKind::ExceedsMaximumSize => "exceeds maximum size",
            RejectionKind::ExceedsMaximumDimension => "exceeds maximum dimension",
            RejectionKind::BelowMinimumDimension => "below minimum dimension",
            RejectionKind::FetchFailed => "fetch failed",
            RejectionKind::UnsupportedFormat => "unsupported image format",
            RejectionKind::CorruptImage => "corrupt image",
            RejectionKind::Timeout => "timeout",
        }
    }
}

/// Result of one validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Verdict {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionKind>,
}

impl Verdict {
    pub fn accepted(metadata: ImageMetadata) -> Self {
        Self {
            valid: true,
            reason: None,
            metadata: Some(metadata),
            rejection: None,
        }
    }

    pub fn rejected(
        kind: RejectionKind,
        reason: impl Into<String>,
        metadata: Option<ImageMetadata>,
    ) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
            metadata,
            rejection: Some(kind),
        }
    }

    /// Rejection carrying the kind's fixed reason text.
    pub fn policy_rejection(kind: RejectionKind, metadata: Option<ImageMetadata>) -> Self {
        Self::rejected(kind, kind.reason(), metadata)
    }

    pub fn timeout() -> Self {
        Self::policy_rejection(RejectionKind::Timeout, None)
    }
}
