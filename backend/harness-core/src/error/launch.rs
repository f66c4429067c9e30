use common::ErrorLocation;

use std::error::Error as StdError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LaunchError {
    #[error("Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The worker terminated on its own. `message` reads `adl return <code>`.
    #[error("Worker Exit Error: {message} {location}")]
    Exited {
        code: Option<i32>,
        message: String,
        location: ErrorLocation,
    },

    #[error("Bind Error: {message} {location}")]
    Bind {
        message: String,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },

    #[error("Accept Error: {message} {location}")]
    Accept {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    AcceptTimeout {
        message: String,
        location: ErrorLocation,
    },

    #[error("App Root Error: {message} {location}")]
    AppRoot {
        message: String,
        location: ErrorLocation,
        #[source]
        source: std::io::Error,
    },
}
