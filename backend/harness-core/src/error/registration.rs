use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RegistrationError {
    /// A registration was attempted before what it depends on was sent.
    #[error("Registration Order Error: {message} {location}")]
    Order {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Module Error: {message} {location}")]
    UnknownModule {
        message: String,
        location: ErrorLocation,
    },
}
