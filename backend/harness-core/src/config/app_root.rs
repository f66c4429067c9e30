use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::error::launch::LaunchError;

use common::ErrorLocation;

use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::{Builder as TempDirBuilder, TempDir};
use uuid::Uuid;

/// Name the app loader is installed under in the app root.
pub const DESIGNER_SWF: &str = "designer.swf";
pub const DESCRIPTOR_FILE: &str = "descriptor.xml";

const TEMP_APP_ROOT_PREFIX: &str = "fud-";

/// Application root directory handed to the worker.
#[derive(Debug)]
pub enum AppRoot {
    /// Debug mode: kept between sessions.
    Persistent(PathBuf),
    /// Removed when the session is torn down.
    Temporary(TempDir),
}

impl AppRoot {
    /// Debug mode reuses the persistent root and only installs the loader
    /// and descriptor when the root is missing. Windows always reinstalls
    /// them. Otherwise a fresh temporary root gets the loader only.
    pub fn prepare(config: &HarnessConfig, session: Uuid) -> Result<Self, HarnessError> {
        let loader = config.app_loader_swf()?;

        if config.debug {
            let root = config.debug_app_root.clone();
            if !root.exists() || cfg!(windows) {
                fs::create_dir_all(&root).map_err(|e| LaunchError::AppRoot {
                    message: format!("Failed to create app root {}: {e}", root.display()),
                    location: ErrorLocation::from(Location::caller()),
                    source: e,
                })?;
                install(&loader, &root.join(DESIGNER_SWF))?;
                install(&config.descriptor()?, &root.join(DESCRIPTOR_FILE))?;
                info!("Installed debug app root at {}", root.display());
            } else {
                debug!("Reusing debug app root at {}", root.display());
            }
            return Ok(AppRoot::Persistent(root));
        }

        let prefix = format!("{TEMP_APP_ROOT_PREFIX}{session}-");
        let root = TempDirBuilder::new()
            .prefix(&prefix)
            .tempdir()
            .map_err(|e| LaunchError::AppRoot {
                message: format!("Failed to create temporary app root: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;
        install(&loader, &root.path().join(DESIGNER_SWF))?;
        debug!("Created app root at {}", root.path().display());
        Ok(AppRoot::Temporary(root))
    }

    pub fn path(&self) -> &Path {
        match self {
            AppRoot::Persistent(path) => path,
            AppRoot::Temporary(dir) => dir.path(),
        }
    }

    /// Remove a temporary root. Failures are logged only.
    pub fn release(self) {
        match self {
            AppRoot::Persistent(path) => debug!("Keeping debug app root {}", path.display()),
            AppRoot::Temporary(dir) => {
                let path = dir.path().to_path_buf();
                match dir.close() {
                    Ok(()) => debug!("Removed app root {}", path.display()),
                    Err(e) => warn!("Failed to remove app root {}: {e}", path.display()),
                }
            }
        }
    }
}

#[track_caller]
fn install(source: &Path, target: &Path) -> Result<(), LaunchError> {
    fs::copy(source, target)
        .map(|_| ())
        .map_err(|e| LaunchError::AppRoot {
            message: format!(
                "Failed to copy {} to {}: {e}",
                source.display(),
                target.display()
            ),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        })
}
