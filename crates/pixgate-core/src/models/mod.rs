//! Domain models

pub mod image;
pub mod policy;
pub mod stats;
pub mod verdict;

pub use image::{ImageFormatKind, ImageMetadata, ImageRef};
pub use policy::{InvalidPolicy, Policy, PolicySettings, BYTES_PER_KB, BYTES_PER_MB};
pub use stats::Stats;
pub use verdict::{RejectionCategory, RejectionKind, Verdict};
