//! Remote test harness for the ADL designer runtime.
//!
//! Launches the worker, accepts its connection back, registers project
//! state over a string-table wire protocol, then drives document tests one
//! unit at a time under a per-unit deadline.

pub mod channel;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod registration;
pub mod session;
pub mod supervisor;

#[cfg(test)]
mod tests;

pub use channel::{SessionChannel, SessionListener, TestClient};
pub use config::HarnessConfig;
pub use driver::{BatchSelection, InteractiveTest, Tester};
pub use error::HarnessError;
pub use executor::UnitExecutor;
pub use registration::{SessionSetup, StyleHolderCollector};
pub use session::{HarnessSession, SessionFailure, run_session};
pub use supervisor::{AdlLauncher, WorkerExit, WorkerLauncher, WorkerProcess};

use const_format::concatcp;

pub const ADL_BINARY: &str = "adl";
pub const HARNESS_HOSTNAME: &str = "127.0.0.1";
pub const CONFIG_FILE_NAME: &str = "harness.json";
pub const DATA_DIR_NAME: &str = "adl-harness";
pub const APP_ROOT_DIR_NAME: &str = "testAppRoot";

const BUILD_DIR: &str = "target";
const ARTIFACT_VERSION: &str = "1.0-SNAPSHOT";

/// Paths below `FUD_HOME`.
pub const PLUGIN_SWF_PATH: &str =
    concatcp!("test-app-plugin/", BUILD_DIR, "/test-", ARTIFACT_VERSION, ".swf");
pub const CONTENT_DIR_PATH: &str = concatcp!("flex-injection/", BUILD_DIR);
pub const DESCRIPTOR_PATH: &str = "designer/src/main/resources/descriptor.xml";
pub const APP_LOADER_SWF_PATH: &str =
    concatcp!("app-loader/", BUILD_DIR, "/app-loader-", ARTIFACT_VERSION, ".swf");
