//! Service layer.

mod generation;

pub use generation::{GenerationService, MAX_VALIDATION_RETRIES, expand_shortcuts};
