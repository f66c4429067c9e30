//! Handle to a running worker.
//!
//! A monitor task owns the child and publishes its exit exactly once on a
//! `watch` channel. Everything else observes that channel: the listener
//! races it against `accept`, a running unit races it against its read,
//! and teardown waits on it after asking the monitor to kill.

use crate::error::launch::LaunchError;

use common::ErrorLocation;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::future::Future;
use std::panic::Location;
use std::process::ExitStatus;

use log::{debug, info, warn};
use tokio::process::Child as TokioChild;
use tokio::spawn as TokioSpawn;
use tokio::sync::{oneshot, watch};

/// How the worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Code(i32),
    /// Ended by a signal the harness did not send.
    Signal,
    /// Killed by [`WorkerProcess::terminate`].
    Terminated,
}

impl WorkerExit {
    pub fn code(self) -> Option<i32> {
        match self {
            WorkerExit::Code(code) => Some(code),
            _ => None,
        }
    }

    /// The error this exit represents on its own, if any. Code 0 and a
    /// harness-initiated kill are not failures.
    #[track_caller]
    pub fn failure(self) -> Option<LaunchError> {
        let message = match self {
            WorkerExit::Code(0) | WorkerExit::Terminated => return None,
            WorkerExit::Code(code) => format!("adl return {code}"),
            WorkerExit::Signal => "adl terminated by signal".to_string(),
        };

        Some(LaunchError::Exited {
            code: self.code(),
            message,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Error for an exit that happened while the session still needed the
    /// worker. Failures keep their own message; a clean exit is reported
    /// with `context`.
    #[track_caller]
    pub fn unexpected(self, context: &str) -> LaunchError {
        match self.failure() {
            Some(error) => error,
            None => LaunchError::Exited {
                code: self.code(),
                message: format!("adl exited ({self}) {context}"),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        status.code().map_or(WorkerExit::Signal, WorkerExit::Code)
    }
}

impl Display for WorkerExit {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            WorkerExit::Code(code) => write!(formatter, "code {code}"),
            WorkerExit::Signal => formatter.write_str("signal"),
            WorkerExit::Terminated => formatter.write_str("terminated"),
        }
    }
}

/// A supervised worker. Dropping it kills the worker.
#[derive(Debug)]
pub struct WorkerProcess {
    label: String,
    pid: Option<u32>,
    exit: watch::Receiver<Option<WorkerExit>>,
    kill: Option<oneshot::Sender<()>>,
}

impl WorkerProcess {
    /// Supervise a spawned child. Must be called inside a Tokio runtime.
    pub fn from_child(label: impl Into<String>, mut child: TokioChild) -> Self {
        let label = label.into();
        let pid = child.id();
        let (exit_tx, exit_rx) = watch::channel(None);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let monitor_label = label.clone();
        TokioSpawn(async move {
            let exit = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => WorkerExit::from(status),
                    Err(e) => {
                        warn!("Failed to wait for {monitor_label}: {e}");
                        WorkerExit::Signal
                    }
                },
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill {monitor_label}: {e}");
                    }
                    WorkerExit::Terminated
                }
            };

            debug!("{monitor_label} exited: {exit}");
            exit_tx.send_replace(Some(exit));
        });

        Self {
            label,
            pid,
            exit: exit_rx,
            kill: Some(kill_tx),
        }
    }

    /// Supervise an in-process future as if it were a worker. The future's
    /// output is the exit code; terminating the worker drops the future.
    pub fn from_future<F>(label: impl Into<String>, worker: F) -> Self
    where
        F: Future<Output = i32> + Send + 'static,
    {
        let label = label.into();
        let (exit_tx, exit_rx) = watch::channel(None);
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let monitor_label = label.clone();
        TokioSpawn(async move {
            let exit = tokio::select! {
                code = worker => WorkerExit::Code(code),
                _ = kill_rx => WorkerExit::Terminated,
            };

            debug!("{monitor_label} exited: {exit}");
            exit_tx.send_replace(Some(exit));
        });

        Self {
            label,
            pid: None,
            exit: exit_rx,
            kill: Some(kill_tx),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// OS process id, `None` for in-process workers.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking: the exit if the worker has already ended.
    pub fn exit_status(&self) -> Option<WorkerExit> {
        *self.exit.borrow()
    }

    /// Error for a worker that already failed on its own.
    #[track_caller]
    pub fn failure(&self) -> Option<LaunchError> {
        self.exit_status().and_then(WorkerExit::failure)
    }

    /// Resolves once the worker has ended. The future owns its own
    /// receiver, so it can be raced against I/O on other session state.
    pub fn exited(&self) -> impl Future<Output = WorkerExit> + Send + 'static {
        let mut exit = self.exit.clone();
        async move {
            match exit.wait_for(Option::is_some).await {
                Ok(value) => (*value).unwrap_or(WorkerExit::Terminated),
                // The monitor only goes away without publishing if the
                // runtime is shutting down, which kills the child with it.
                Err(_) => WorkerExit::Terminated,
            }
        }
    }

    pub async fn wait_for_exit(&self) -> WorkerExit {
        self.exited().await
    }

    /// Kill the worker and wait for the monitor to observe it.
    ///
    /// Idempotent: after a previous call, or once the worker has exited on
    /// its own, this returns `Ok` without doing anything.
    pub async fn terminate(&mut self) -> Result<(), LaunchError> {
        let Some(kill) = self.kill.take() else {
            return Ok(());
        };

        if let Some(exit) = self.exit_status() {
            debug!("{} already exited ({exit}), nothing to terminate", self.label);
            return Ok(());
        }

        if kill.send(()).is_err() {
            // The monitor finished between the check above and the send.
            return Ok(());
        }

        let exit = self.wait_for_exit().await;
        info!("{} stopped ({exit})", self.label);
        Ok(())
    }
}
