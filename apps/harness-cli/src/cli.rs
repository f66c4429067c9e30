//! Command-line arguments for `adl-harness`.

use crate::logger::{DEFAULT_LOG_LEVEL, VERBOSE_LOG_LEVEL};

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

pub const DEFAULT_PROJECT_NAME: &str = "harness";
pub const DEFAULT_MODULE_NAME: &str = "app";

/// Run designer test documents against an `adl` worker
#[derive(Parser, Debug)]
#[command(name = "adl-harness")]
#[command(version)]
#[command(about = "Run designer test documents against an adl worker", long_about = None)]
pub struct Cli {
    /// Config file (default: ./harness.json when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project name sent to the worker
    #[arg(long, value_name = "NAME", default_value = DEFAULT_PROJECT_NAME)]
    pub project: String,

    /// User library archive, in load order. Repeat for each library.
    #[arg(
        long = "library",
        value_name = "PATH",
        required_unless_present = "sdk_libraries"
    )]
    pub libraries: Vec<PathBuf>,

    /// SDK library archive, in load order. Loaded before user libraries.
    #[arg(long = "sdk-library", value_name = "PATH")]
    pub sdk_libraries: Vec<PathBuf>,

    /// Module the documents belong to
    #[arg(long, value_name = "NAME", default_value = DEFAULT_MODULE_NAME)]
    pub module: String,

    /// Test group (default: each document's directory name)
    #[arg(long, value_name = "NAME")]
    pub group: Option<String>,

    /// Test only the last document; the others are auxiliary files
    #[arg(long)]
    pub last_only: bool,

    /// Log at trace level, including the worker's output
    #[arg(short, long)]
    pub verbose: bool,

    /// Directory for the log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Documents to test, in order
    #[arg(value_name = "DOCUMENT", required = true)]
    pub documents: Vec<PathBuf>,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            VERBOSE_LOG_LEVEL
        } else {
            DEFAULT_LOG_LEVEL
        }
    }
}
