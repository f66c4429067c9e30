//! A harness session from launch to teardown.
//!
//! Setup is a single flow: prepare the app root, bind, launch, accept,
//! register. Documents then run one at a time through the unit executor,
//! with the channel moved into each unit and handed back with its result.
//! Any fatal error poisons the session; teardown always runs.

use crate::channel::{SessionChannel, SessionListener};
use crate::config::{AppRoot, HarnessConfig};
use crate::driver::{ArtifactFilter, BatchSelection, Tester, run_document};
use crate::error::{HarnessError, ProtocolError};
use crate::error::session::SessionError;
use crate::executor::UnitExecutor;
use crate::registration::{ModuleRegistry, SessionSetup, register_state};
use crate::supervisor::{WorkerLauncher, WorkerProcess};

use common::ErrorLocation;
use models::{DocumentUnit, SessionReport, TestOutcome, UnitReport, UnitResult};

use std::panic::Location;
use std::time::Duration;

use futures_util::future::BoxFuture;
use log::{debug, error, info, warn};
use thiserror::Error as ThisError;
use tokio::time::timeout;
use uuid::Uuid;

/// How long a closed channel waits for the worker's exit to explain it.
const EXIT_GRACE: Duration = Duration::from_millis(500);

pub struct HarnessSession {
    id: Uuid,
    worker: WorkerProcess,
    channel: Option<SessionChannel>,
    modules: ModuleRegistry,
    executor: UnitExecutor,
    artifacts: ArtifactFilter,
    app_root: AppRoot,
    report: SessionReport,
    poisoned: Option<String>,
    /// Bound on setup and teardown exchanges that have no result to wait for.
    exchange_deadline: Duration,
}

/// A session that ended on a fatal error, with the results it had so far.
#[derive(Debug, ThisError)]
#[error("{error}")]
pub struct SessionFailure {
    pub error: HarnessError,
    pub report: SessionReport,
}

impl HarnessSession {
    /// Launch the worker, accept its connection and register `setup`.
    ///
    /// Whatever was acquired before a failing step is released before the
    /// error is returned.
    pub async fn start(
        config: &HarnessConfig,
        launcher: &dyn WorkerLauncher,
        setup: &SessionSetup,
    ) -> Result<Self, HarnessError> {
        let id = Uuid::new_v4();
        let exchange_deadline = config.unit_timeout();
        info!("Starting session {id} for project {}", setup.project().name());

        let artifacts = config.artifact_filter()?;
        let executor = UnitExecutor::new(config.max_concurrent_units, config.unit_timeout());
        let app_root = AppRoot::prepare(config, id)?;

        let (worker, listener) = match launch(config, launcher, &app_root) {
            Ok(launched) => launched,
            Err(e) => {
                error!("Session {id} failed to launch: {e}");
                app_root.release();
                return Err(e);
            }
        };

        let mut channel =
            match SessionChannel::establish(listener, &worker, config.accept_timeout()).await {
                Ok(channel) => channel,
                Err(e) => {
                    error!("Session {id} failed to connect: {e}");
                    teardown(id, None, worker, app_root, exchange_deadline).await;
                    return Err(e.into());
                }
            };

        let registration = within(
            exchange_deadline,
            "Registering session state",
            register_state(channel.client(), setup),
        )
        .await;
        let modules = match registration {
            Ok(modules) => modules,
            Err(e) => {
                error!("Session {id} failed to register state: {e}");
                teardown(id, Some(channel), worker, app_root, exchange_deadline).await;
                return Err(e);
            }
        };

        info!("Session {id} ready");
        Ok(Self {
            id,
            worker,
            channel: Some(channel),
            modules,
            executor,
            artifacts,
            app_root,
            report: SessionReport::default(),
            poisoned: None,
            exchange_deadline,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn worker(&self) -> &WorkerProcess {
        &self.worker
    }

    /// Everything run so far, across batches.
    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Run `documents` of `module` in order and report each of them.
    ///
    /// Documents outside `selection` and files that are not test artifacts
    /// are reported as skipped. A failing document does not stop the
    /// batch; an error does. The document it interrupted is reported as
    /// failed before the error is returned.
    pub async fn run_batch<F>(
        &mut self,
        module: &str,
        documents: Vec<DocumentUnit>,
        selection: BatchSelection,
        mut tester_for: F,
    ) -> Result<SessionReport, HarnessError>
    where
        F: FnMut(&DocumentUnit) -> Tester,
    {
        self.ensure_usable()?;

        let total = documents.len();
        let mut report = SessionReport::default();

        for (index, document) in documents.into_iter().enumerate() {
            let name = document.name().to_string();

            if !selection.includes(index, total) {
                debug!("Skipping {} (auxiliary document)", document.file_name());
                self.record(&mut report, name, UnitResult::Skipped);
                continue;
            }

            if !self.artifacts.is_artifact(&document) {
                info!("Skipping {} (not a test artifact)", document.file_name());
                self.record(&mut report, name, UnitResult::Skipped);
                continue;
            }

            let tester = tester_for(&document);
            let outcome = match self.run_unit(module, document, tester).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let failure = TestOutcome::failed(&name, &e.to_string());
                    self.record(&mut report, name, UnitResult::Completed(failure));
                    return Err(e);
                }
            };
            self.record(&mut report, name, UnitResult::Completed(outcome));
        }

        info!(
            "Session {}: batch finished, {} passed, {} failed, {} skipped",
            self.id,
            report.passed(),
            report.failed(),
            report.skipped()
        );
        Ok(report)
    }

    /// Close the channel, stop the worker and remove the app root. Each
    /// step runs even if an earlier one failed.
    pub async fn shutdown(self) {
        let Self {
            id,
            worker,
            mut channel,
            app_root,
            poisoned,
            exchange_deadline,
            ..
        } = self;

        if poisoned.is_none()
            && let Some(channel) = channel.as_mut()
            && let Err(e) = within(
                exchange_deadline,
                "Closing the project",
                channel.client().close_project(),
            )
            .await
        {
            warn!("Session {id}: failed to close project: {e}");
        }

        teardown(id, channel, worker, app_root, exchange_deadline).await;
    }

    async fn run_unit(
        &mut self,
        module: &str,
        document: DocumentUnit,
        tester: Tester,
    ) -> Result<TestOutcome, HarnessError> {
        if let Some(exit) = self.worker.exit_status() {
            let error = exit.unexpected(&format!("before {} could run", document.name()));
            self.poison(&error);
            return Err(error.into());
        }

        let Some(channel) = self.channel.as_mut() else {
            return Err(self.poisoned_error().into());
        };
        let module_id = match self.modules.resolve(channel.client(), module).await {
            Ok(id) => id,
            Err(e) => {
                if matches!(e, HarnessError::Protocol(_)) {
                    self.poison(&e);
                }
                return Err(e);
            }
        };

        let Some(mut channel) = self.channel.take() else {
            return Err(self.poisoned_error().into());
        };
        let exited = self.worker.exited();
        let name = document.name().to_string();
        let context = format!("while testing {name}");

        let result = self
            .executor
            .run(&name, async move {
                let outcome = {
                    let (client, reader) = channel.split();
                    tokio::select! {
                        biased;

                        outcome = run_document(client, reader, module_id, &document, &tester) => outcome,
                        exit = exited => Err(HarnessError::from(exit.unexpected(&context))),
                    }
                };
                (channel, outcome)
            })
            .await;

        match result {
            Ok((channel, Ok(outcome))) => {
                self.channel = Some(channel);
                Ok(outcome)
            }
            Ok((channel, Err(e))) => {
                self.channel = Some(channel);
                let e = self.attribute_to_exit(e).await;
                self.poison(&e);
                Err(e)
            }
            Err(e) => {
                self.poison(&e);
                Err(e.into())
            }
        }
    }

    /// A worker that dies mid-read usually surfaces as a closed channel
    /// first. Report the exit instead when it follows shortly after.
    async fn attribute_to_exit(&self, error: HarnessError) -> HarnessError {
        if !matches!(
            error,
            HarnessError::Protocol(ProtocolError::Closed { .. } | ProtocolError::Io { .. })
        ) {
            return error;
        }

        match timeout(EXIT_GRACE, self.worker.exited()).await {
            Ok(exit) => match exit.failure() {
                Some(failure) => failure.into(),
                None => error,
            },
            Err(_) => error,
        }
    }

    fn record(&mut self, report: &mut SessionReport, document: String, result: UnitResult) {
        let unit = UnitReport { document, result };
        self.report.record(unit.clone());
        report.record(unit);
    }

    fn ensure_usable(&self) -> Result<(), SessionError> {
        if self.poisoned.is_some() || self.channel.is_none() {
            return Err(self.poisoned_error());
        }
        Ok(())
    }

    #[track_caller]
    fn poisoned_error(&self) -> SessionError {
        let reason = self.poisoned.as_deref().unwrap_or("channel is not available");
        SessionError::Poisoned {
            message: format!("Session {} can no longer run tests: {reason}", self.id),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    fn poison(&mut self, error: &dyn std::error::Error) {
        error!("Session {} poisoned: {error}", self.id);
        if self.poisoned.is_none() {
            self.poisoned = Some(error.to_string());
        }
    }
}

/// Start, run `body`, then shut down whether or not `body` succeeded.
///
/// On error the failure carries every result the session recorded before
/// it.
pub async fn run_session<F>(
    config: &HarnessConfig,
    launcher: &dyn WorkerLauncher,
    setup: &SessionSetup,
    body: F,
) -> Result<SessionReport, SessionFailure>
where
    F: for<'a> FnOnce(&'a mut HarnessSession) -> BoxFuture<'a, Result<SessionReport, HarnessError>>,
{
    let mut session = match HarnessSession::start(config, launcher, setup).await {
        Ok(session) => session,
        Err(error) => {
            return Err(SessionFailure {
                error,
                report: SessionReport::default(),
            });
        }
    };

    let result = body(&mut session).await;
    let report = session.report().clone();
    session.shutdown().await;

    result.map_err(|error| SessionFailure { error, report })
}

/// Run a setup or teardown exchange under `deadline`.
async fn within<T>(
    deadline: Duration,
    exchange: &str,
    future: impl Future<Output = Result<T, HarnessError>>,
) -> Result<T, HarnessError> {
    match timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Stalled {
            message: format!("{exchange} did not finish within {deadline:?}"),
            location: ErrorLocation::from(Location::caller()),
        }
        .into()),
    }
}

fn launch(
    config: &HarnessConfig,
    launcher: &dyn WorkerLauncher,
    app_root: &AppRoot,
) -> Result<(WorkerProcess, SessionListener), HarnessError> {
    let listener = SessionListener::bind()?;
    let launch_config = config.launch_config(listener.port(), app_root.path())?;
    let worker = launcher.launch(&launch_config)?;
    Ok((worker, listener))
}

/// Channel first, then the worker, then the app root.
async fn teardown(
    id: Uuid,
    channel: Option<SessionChannel>,
    mut worker: WorkerProcess,
    app_root: AppRoot,
    deadline: Duration,
) {
    if let Some(channel) = channel {
        channel.close(deadline).await;
    }

    if let Err(e) = worker.terminate().await {
        warn!("Session {id}: failed to terminate {}: {e}", worker.label());
    }

    app_root.release();
    info!("Session {id} torn down");
}
