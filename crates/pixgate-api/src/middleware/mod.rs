pub mod error_envelope;
pub mod image_validation;

pub use error_envelope::error_envelope_middleware;
pub use image_validation::{image_validation_middleware, ValidatedImages};
pub use pixgate_infra::{get_request_id, request_id_middleware};
