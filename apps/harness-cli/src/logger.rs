//! Logging for the harness runner.
//!
//! The console gets coloured levels; the log file in `--log-dir` gets the
//! same lines plus the source position, which is what a failed CI run is
//! debugged from. The global logger can only be installed once per process.

use crate::error::RunnerError;

use common::ErrorLocation;

use std::fmt::Arguments;
use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

static INIT_LOGGER_ONCE: Once = Once::new();

static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

pub const LOG_FILE_NAME: &str = "adl-harness.log";

/// Level without `--verbose`.
#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// Level with `--verbose`: includes the worker's own output.
pub const VERBOSE_LOG_LEVEL: LevelFilter = LevelFilter::Trace;

/// Install the global logger at `level`, writing to stdout and
/// `{log_dir}/adl-harness.log`.
///
/// Later calls log a warning and return `Ok`.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or another logger
/// is already installed.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), RunnerError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = build_dispatch(log_dir, level).and_then(apply);
        if result.is_ok() {
            info!("Logging at {level} to {}", log_dir.join(LOG_FILE_NAME).display());
        }
    });

    result
}

/// Console and file dispatch under one level filter. Builds nothing
/// global, so it can fail without consuming the one-time installation.
#[track_caller]
pub(crate) fn build_dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch, RunnerError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = fern::log_file(&log_file_path).map_err(|e| RunnerError::Runner {
        message: format!(
            "Failed to create log file {}: {e}",
            log_file_path.display()
        ),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let console = Dispatch::new()
        .format(move |out, message, record| line(out, colors.color(record.level()), message, None))
        .chain(stdout());

    let file = Dispatch::new()
        .format(|out, message, record| line(out, record.level(), message, Some(record)))
        .chain(log_file);

    Ok(Dispatch::new().level(level).chain(console).chain(file))
}

#[track_caller]
fn apply(dispatch: Dispatch) -> Result<(), RunnerError> {
    dispatch.apply().map_err(|e| RunnerError::Runner {
        message: format!("Failed to initialize logger: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// `[<rfc3339> - <level>] <message>`, with ` [file:line]` when a record
/// is given.
fn line(
    out: FormatCallback<'_>,
    level: impl std::fmt::Display,
    message: &Arguments<'_>,
    source: Option<&Record<'_>>,
) {
    let date = format_rfc3339(SystemTime::now());
    match source {
        Some(record) => out.finish(format_args!(
            "[{date} - {level}] {message} [{file}:{line}]",
            file = record.file().unwrap_or("unknown"),
            line = record.line().unwrap_or(0),
        )),
        None => out.finish(format_args!("[{date} - {level}] {message}")),
    }
}
