//! Pixgate Processing Library
//!
//! Pure, synchronous image inspection: metadata probing from raw bytes and policy
//! evaluation of the probed metadata. Nothing here performs I/O.

pub mod evaluator;
pub mod probe;

pub use evaluator::PolicyEvaluator;
pub use probe::{MetadataProbe, ProbeError};
