//! Tower Layer implementations for runtime calls

pub mod validation;

pub use validation::{CallValidationLayer, CallValidationService};
