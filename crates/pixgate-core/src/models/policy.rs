use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * 1024;

const DEFAULT_MAX_BYTES: u64 = 2 * BYTES_PER_MB;
const DEFAULT_MIN_DIMENSION_PX: u32 = 200;
const DEFAULT_MAX_DIMENSION_PX: u32 = 2048;
const DEFAULT_COMPRESSION_QUALITY: u8 = 80;

/// Policy update rejected because its bounds are inconsistent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid policy: {0}")]
pub struct InvalidPolicy(pub String);

/// Compliance policy for one tenant, in internal units (bytes and pixels).
///
/// `compression_quality` and `auto_optimize` are stored and reported back to the
/// dashboard but never applied; images are only checked, not transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub min_bytes: u64,
    pub max_bytes: u64,
    pub min_dimension_px: u32,
    pub max_dimension_px: u32,
    pub compression_quality: u8,
    pub auto_optimize: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_bytes: 0,
            max_bytes: DEFAULT_MAX_BYTES,
            min_dimension_px: DEFAULT_MIN_DIMENSION_PX,
            max_dimension_px: DEFAULT_MAX_DIMENSION_PX,
            compression_quality: DEFAULT_COMPRESSION_QUALITY,
            auto_optimize: false,
        }
    }
}

impl Policy {
    /// Check the ordering invariant: both lower bounds strictly below their upper bounds.
    pub fn validate(&self) -> Result<(), InvalidPolicy> {
        if self.min_bytes >= self.max_bytes {
            return Err(InvalidPolicy(format!(
                "minimum size ({} bytes) must be less than maximum size ({} bytes)",
                self.min_bytes, self.max_bytes
            )));
        }

        if self.min_dimension_px >= self.max_dimension_px {
            return Err(InvalidPolicy(format!(
                "minimum dimension ({}px) must be less than maximum dimension ({}px)",
                self.min_dimension_px, self.max_dimension_px
            )));
        }

        Ok(())
    }
}

/// Settings API representation of a policy.
///
/// Sizes are expressed in KB (minimum) and MB (maximum) as the dashboard edits them.
/// Missing fields take the default policy's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct PolicySettings {
    #[serde(rename = "minSizeKB")]
    #[validate(range(min = 0.0))]
    pub min_size_kb: f64,

    #[serde(rename = "maxSizeMB")]
    #[validate(range(min = 0.0))]
    pub max_size_mb: f64,

    #[serde(rename = "maxDimension")]
    #[validate(range(min = 1))]
    pub max_dimension: u32,

    #[serde(rename = "minDimension")]
    #[validate(range(min = 1))]
    pub min_dimension: u32,

    #[serde(rename = "compressionQuality")]
    #[validate(range(min = 1, max = 100))]
    pub compression_quality: u8,

    #[serde(rename = "autoOptimize")]
    pub auto_optimize: bool,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Policy::default().into()
    }
}

impl PolicySettings {
    /// Convert to internal units. Fractional sizes round to the nearest byte.
    pub fn to_policy(&self) -> Policy {
        Policy {
            min_bytes: (self.min_size_kb * BYTES_PER_KB as f64).round() as u64,
            max_bytes: (self.max_size_mb * BYTES_PER_MB as f64).round() as u64,
            min_dimension_px: self.min_dimension,
            max_dimension_px: self.max_dimension,
            compression_quality: self.compression_quality,
            auto_optimize: self.auto_optimize,
        }
    }
}

impl From<Policy> for PolicySettings {
    fn from(policy: Policy) -> Self {
        Self {
            min_size_kb: policy.min_bytes as f64 / BYTES_PER_KB as f64,
            max_size_mb: policy.max_bytes as f64 / BYTES_PER_MB as f64,
            max_dimension: policy.max_dimension_px,
            min_dimension: policy.min_dimension_px,
            compression_quality: policy.compression_quality,
            auto_optimize: policy.auto_optimize,
        }
    }
}
