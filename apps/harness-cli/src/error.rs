use harness_core::HarnessError;

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors that end an `adl-harness` run.
///
/// A failed run writes the JSON form to stderr for whatever invoked it,
/// with the location tracking kept intact.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum RunnerError {
    /// Error from the runner itself (logging, paths)
    #[error("Runner Error: {message} {location}")]
    Runner {
        message: String,
        location: ErrorLocation,
    },

    /// A document or library could not be read
    #[error("Input Error: {message} {location}")]
    Input {
        message: String,
        location: ErrorLocation,
    },

    /// Error from the harness session (launch, protocol, timeouts)
    #[error("Harness Error: {message} {location}")]
    Harness {
        message: String,
        location: ErrorLocation,
    },
}

impl RunnerError {
    /// One-line JSON form, or the display text if it cannot be serialized.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_string())
    }
}

impl From<HarnessError> for RunnerError {
    #[track_caller]
    fn from(error: HarnessError) -> Self {
        RunnerError::Harness {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
