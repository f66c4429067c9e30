//! One `adl-harness` run: read the inputs, run a session, report.

use crate::cli::Cli;
use crate::error::RunnerError;

use harness_core::{
    AdlLauncher, BatchSelection, DATA_DIR_NAME, HarnessConfig, HarnessError, SessionSetup,
    Tester, WorkerLauncher, run_session,
};

use common::ErrorLocation;
use models::{
    DocumentUnit, LibraryDescriptor, LibrarySet, LibrarySetBuilder, LibrarySetId,
    ModuleDescriptor, ProjectDescriptor, SessionReport, UnitResult,
};

use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{error, info};

const LOG_DIR_NAME: &str = "logs";

/// Group used for a document given without a directory.
const FALLBACK_GROUP: &str = "default";

/// Where the log file goes when `--log-dir` is not given.
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(DATA_DIR_NAME)
        .join(LOG_DIR_NAME)
}

/// Resolve the configuration and run every document with the real `adl`.
pub async fn run(cli: &Cli) -> Result<SessionReport, RunnerError> {
    let config = HarnessConfig::resolve(cli.config.as_deref()).map_err(HarnessError::from)?;
    run_with(cli, &config, &AdlLauncher::new()).await
}

/// Run every document in one session started by `launcher`.
pub async fn run_with(
    cli: &Cli,
    config: &HarnessConfig,
    launcher: &dyn WorkerLauncher,
) -> Result<SessionReport, RunnerError> {
    let setup = session_setup(cli)?;
    let documents = load_documents(&cli.documents, cli.group.as_deref())?;
    let selection = if cli.last_only {
        BatchSelection::LastOnly
    } else {
        BatchSelection::All
    };
    let module = cli.module.clone();

    info!(
        "Running {} document(s) of module {module} in project {}",
        documents.len(),
        setup.project().name()
    );

    let result = run_session(config, launcher, &setup, move |session| {
        Box::pin(async move {
            session
                .run_batch(&module, documents, selection, |_| Tester::Standard)
                .await
        })
    })
    .await;

    match result {
        Ok(report) => Ok(report),
        Err(failure) => {
            if !failure.report.reports().is_empty() {
                error!("Session ended early, results so far:");
                log_report(&failure.report);
            }
            Err(failure.error.into())
        }
    }
}

/// Project from `--project` and the working directory, one library set
/// from `--sdk-library` then `--library`, and the `--module` module.
pub fn session_setup(cli: &Cli) -> Result<SessionSetup, RunnerError> {
    let location = std::env::current_dir().map_err(|e| RunnerError::Runner {
        message: format!("Failed to read the working directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let project = ProjectDescriptor::from_location(cli.project.as_str(), &location);
    let set = library_set(&project, &cli.sdk_libraries, &cli.libraries)?;

    Ok(SessionSetup::new(project, set).with_module(ModuleDescriptor::new(cli.module.as_str())))
}

/// SDK libraries come first, then user libraries, each group in
/// command-line order. A path given twice is registered once, at its first
/// position and with the kind it was first given as.
pub fn library_set(
    project: &ProjectDescriptor,
    sdk_libraries: &[PathBuf],
    user_libraries: &[PathBuf],
) -> Result<LibrarySet, RunnerError> {
    let libraries = sdk_libraries
        .iter()
        .map(|path| (path, false))
        .chain(user_libraries.iter().map(|path| (path, true)));

    let capacity = sdk_libraries.len() + user_libraries.len();
    let mut seen: Vec<&Path> = Vec::with_capacity(capacity);
    let mut descriptors = Vec::with_capacity(capacity);

    for (path, user_library) in libraries {
        if seen.contains(&path.as_path()) {
            continue;
        }
        seen.push(path);

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| RunnerError::Input {
                message: format!("Library path {} has no file name", path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let position = u32::try_from(descriptors.len()).map_err(|e| RunnerError::Input {
            message: format!("Too many libraries: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        descriptors.push(LibraryDescriptor::new(
            name,
            path.to_string_lossy(),
            position,
            user_library,
        ));
    }

    LibrarySetBuilder::default()
        .with_id(LibrarySetId::for_project(project))
        .with_libraries(descriptors)
        .build()
        .map_err(|e| HarnessError::from(e).into())
}

/// Read each document. Without `group`, a document's group is the name of
/// the directory it lives in.
pub fn load_documents(
    paths: &[PathBuf],
    group: Option<&str>,
) -> Result<Vec<DocumentUnit>, RunnerError> {
    paths
        .iter()
        .map(|path| {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| RunnerError::Input {
                    message: format!("Document path {} has no file name", path.display()),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            let content = fs::read(path).map_err(|e| RunnerError::Input {
                message: format!("Failed to read {}: {e}", path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let group = match group {
                Some(group) => group.to_string(),
                None => directory_group(path),
            };

            Ok(DocumentUnit::new(file_name, group, content))
        })
        .collect()
}

fn directory_group(path: &Path) -> String {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_GROUP.to_string())
}

/// Log each result and a summary line.
pub fn log_report(report: &SessionReport) {
    for unit in report.reports() {
        match &unit.result {
            UnitResult::Completed(outcome) if outcome.is_passed() => info!("PASS {}", unit.document),
            UnitResult::Completed(_) => error!("FAIL {}", unit.document),
            UnitResult::Skipped => info!("SKIP {}", unit.document),
        }
    }

    for failure in report.failures() {
        error!("{failure}");
    }

    info!(
        "{} passed, {} failed, {} skipped",
        report.passed(),
        report.failed(),
        report.skipped()
    );
}
