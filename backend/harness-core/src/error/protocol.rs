use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use thiserror::Error as ThisError;

/// Channel-level faults. None of them is recoverable: field order is the
/// contract, so after a bad byte the stream position is meaningless.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Desync Error: {message} {location}")]
    Desync {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },
}

impl ProtocolError {
    #[track_caller]
    pub(crate) fn desync(message: impl Into<String>) -> Self {
        ProtocolError::Desync {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<IoError> for ProtocolError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            ProtocolError::Closed {
                message: format!("Worker closed the connection mid-record: {error}"),
                location: ErrorLocation::from(Location::caller()),
            }
        } else {
            ProtocolError::Io {
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        }
    }
}
