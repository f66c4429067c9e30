mod builder;

pub use builder::LaunchConfigBuilder;

use std::path::{Path, PathBuf};

/// Everything needed to start the worker and have it call back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    pub(crate) executable: PathBuf,
    pub(crate) runtime: PathBuf,
    pub(crate) plugin_swf: PathBuf,
    pub(crate) content_dir: PathBuf,
    pub(crate) descriptor: PathBuf,
    pub(crate) port: u16,
    pub(crate) app_root: PathBuf,
}

impl LaunchConfig {
    /// Path of the `adl` executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// AIR runtime directory passed via `-runtime`.
    pub fn runtime(&self) -> &Path {
        &self.runtime
    }

    pub fn plugin_swf(&self) -> &Path {
        &self.plugin_swf
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Application descriptor XML.
    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    /// Port of the harness listening socket the worker connects back to.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }
}
