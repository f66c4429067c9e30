use crate::error::model_error::ModelError;
use crate::launch::LaunchConfig;
use crate::ErrorLocation;

use std::panic::Location;
use std::path::PathBuf;

/// Builder for creating validated [`LaunchConfig`] instances.
#[derive(Debug, Default)]
pub struct LaunchConfigBuilder {
    executable: Option<PathBuf>,
    runtime: Option<PathBuf>,
    plugin_swf: Option<PathBuf>,
    content_dir: Option<PathBuf>,
    descriptor: Option<PathBuf>,
    port: Option<u16>,
    app_root: Option<PathBuf>,
}

impl LaunchConfigBuilder {
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_runtime(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime = Some(path.into());
        self
    }

    pub fn with_plugin_swf(mut self, path: impl Into<PathBuf>) -> Self {
        self.plugin_swf = Some(path.into());
        self
    }

    pub fn with_content_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(path.into());
        self
    }

    pub fn with_descriptor(mut self, path: impl Into<PathBuf>) -> Self {
        self.descriptor = Some(path.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_app_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.app_root = Some(path.into());
        self
    }

    /// Build the LaunchConfig with validation.
    #[track_caller]
    pub fn build(self) -> Result<LaunchConfig, ModelError> {
        let executable = required_path(self.executable, "Executable")?;
        let runtime = required_path(self.runtime, "Runtime path")?;
        let plugin_swf = required_path(self.plugin_swf, "Plugin SWF")?;
        let content_dir = required_path(self.content_dir, "Content directory")?;
        let descriptor = required_path(self.descriptor, "Descriptor")?;
        let app_root = required_path(self.app_root, "App root directory")?;

        let port = self.port.ok_or_else(|| ModelError::Missing {
            field: "Callback port",
            location: ErrorLocation::from(Location::caller()),
        })?;

        if port == 0 {
            return Err(ModelError::Validation {
                message: String::from("Callback port must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(LaunchConfig {
            executable,
            runtime,
            plugin_swf,
            content_dir,
            descriptor,
            port,
            app_root,
        })
    }
}

#[track_caller]
fn required_path(path: Option<PathBuf>, what: &'static str) -> Result<PathBuf, ModelError> {
    match path {
        None => Err(ModelError::Missing {
            field: what,
            location: ErrorLocation::from(Location::caller()),
        }),
        Some(path) if path.as_os_str().is_empty() => Err(ModelError::Validation {
            message: format!("{what} cannot be empty"),
            location: ErrorLocation::from(Location::caller()),
        }),
        Some(path) => Ok(path),
    }
}
