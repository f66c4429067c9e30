use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum SessionError {
    /// No result within the per-unit deadline. Names the document.
    #[error("Timeout Error: {message} {location}")]
    Timeout {
        document: String,
        message: String,
        location: ErrorLocation,
    },

    /// An earlier fatal error left the session without a usable channel.
    #[error("Poisoned Session Error: {message} {location}")]
    Poisoned {
        message: String,
        location: ErrorLocation,
    },

    /// A setup or teardown exchange did not finish within its deadline.
    #[error("Stalled Channel Error: {message} {location}")]
    Stalled {
        message: String,
        location: ErrorLocation,
    },

    #[error("Panic Error: {message} {location}")]
    Panicked {
        message: String,
        location: ErrorLocation,
    },

    #[error("Pool Error: {message} {location}")]
    Pool {
        message: String,
        location: ErrorLocation,
    },
}
