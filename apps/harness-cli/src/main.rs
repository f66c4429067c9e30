use harness_cli::cli::Cli;
use harness_cli::error::RunnerError;
use harness_cli::logger::initialize as LoggerInitialize;
use harness_cli::runner::{default_log_dir, log_report, run};

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().unwrap_or_else(default_log_dir);
    let logging = create_dir_all(&log_dir)
        .map_err(|e| RunnerError::Runner {
            message: format!("Failed to create log directory {}: {e}", log_dir.display()),
            location: ErrorLocation::from(Location::caller()),
        })
        .and_then(|()| LoggerInitialize(&log_dir, cli.log_level()));

    if let Err(e) = logging {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    info!("adl-harness starting");
    info!("Log directory: {}", log_dir.display());

    match run(&cli).await {
        Ok(report) => {
            log_report(&report);
            if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{e}");
            eprintln!("{}", e.to_json());
            ExitCode::FAILURE
        }
    }
}
