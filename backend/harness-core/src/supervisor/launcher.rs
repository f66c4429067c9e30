use crate::error::launch::LaunchError;
use crate::supervisor::process::WorkerProcess;

use common::ErrorLocation;
use models::LaunchConfig;

use std::panic::Location;
use std::process::Stdio;

use log::{debug, info, trace};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::spawn as TokioSpawn;

const RUNTIME_FLAG: &str = "-runtime";
const ARGUMENTS_SEPARATOR: &str = "--";
const PLUGIN_FLAG: &str = "-p";
const CONTENT_DIR_FLAG: &str = "-cdd";

/// Starts a worker for a session.
///
/// The returned process must already be running; whether it connects back
/// is the listener's concern.
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, config: &LaunchConfig) -> Result<WorkerProcess, LaunchError>;
}

/// Launches the real `adl` executable.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdlLauncher;

impl AdlLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl WorkerLauncher for AdlLauncher {
    fn launch(&self, config: &LaunchConfig) -> Result<WorkerProcess, LaunchError> {
        let executable = config.executable().display().to_string();
        info!("Launching {executable} with callback port {}", config.port());

        let mut child = build_adl_command(config)
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                message: format!("Failed to spawn {executable}: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(e),
            })?;

        debug!("Spawned {executable} (PID: {:?})", child.id());

        if let Some(stdout) = child.stdout.take() {
            TokioSpawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!("adl stdout: {line}");
                }
            });
        }

        if let Some(stderr) = child.stderr.take() {
            TokioSpawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    trace!("adl stderr: {line}");
                }
            });
        }

        Ok(WorkerProcess::from_child(executable, child))
    }
}

/// `<adl> -runtime <air> <descriptor> <app root> -- <port> -p <plugin> -cdd <content dir>`
pub(crate) fn build_adl_command(config: &LaunchConfig) -> TokioCommand {
    let mut cmd = TokioCommand::new(config.executable());
    cmd.arg(RUNTIME_FLAG)
        .arg(config.runtime())
        .arg(config.descriptor())
        .arg(config.app_root())
        .arg(ARGUMENTS_SEPARATOR)
        .arg(config.port().to_string())
        .arg(PLUGIN_FLAG)
        .arg(config.plugin_swf())
        .arg(CONTENT_DIR_FLAG)
        .arg(config.content_dir())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}
