pub mod config;
pub mod launch;
pub mod protocol;
pub mod registration;
pub mod session;

pub use config::ConfigError;
pub use launch::LaunchError;
pub use protocol::ProtocolError;
pub use registration::RegistrationError;
pub use session::SessionError;

use models::ModelError;

use thiserror::Error;

/// Every fault a harness session can surface. All of them are fatal to the
/// session; failing document tests are reported as outcomes instead.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
