use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Rejected model construction. Builders return these instead of
/// producing a value the worker would misinterpret.
#[derive(Debug, ThisError)]
pub enum ModelError {
    /// A required builder field was never set.
    #[error("Missing Field Error: {field} is required {location}")]
    Missing {
        field: &'static str,
        location: ErrorLocation,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },
}
