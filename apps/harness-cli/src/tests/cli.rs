use crate::cli::{Cli, DEFAULT_MODULE_NAME, DEFAULT_PROJECT_NAME};

use std::path::PathBuf;

use clap::{CommandFactory, Parser};

#[test]
fn given_cli_definition_then_is_consistent() {
    Cli::command().debug_assert();
}

/// **VALUE**: Verifies repeated `--library` flags keep their order.
///
/// **WHY THIS MATTERS**: Library position is load order on the worker. The order on the
/// command line is the order the user resolved.
///
/// **BUG THIS CATCHES**: Would catch the flag being parsed into a set or sorted.
#[test]
fn given_repeated_libraries_when_parsed_then_order_is_kept() {
    // GIVEN/WHEN: Two libraries, B first
    let cli = Cli::try_parse_from([
        "adl-harness",
        "--library",
        "libs/B.swc",
        "--library",
        "libs/A.swc",
        "--last-only",
        "tests/Aux.mxml",
        "tests/Form.mxml",
    ])
    .unwrap();

    // THEN: Order and flags as given, defaults elsewhere
    assert_eq!(
        cli.libraries,
        vec![PathBuf::from("libs/B.swc"), PathBuf::from("libs/A.swc")]
    );
    assert!(cli.last_only);
    assert_eq!(cli.documents.len(), 2);
    assert_eq!(cli.project, DEFAULT_PROJECT_NAME);
    assert_eq!(cli.module, DEFAULT_MODULE_NAME);
    assert!(cli.group.is_none());
}

#[test]
fn given_no_documents_when_parsed_then_rejected() {
    let result = Cli::try_parse_from(["adl-harness", "--library", "libs/A.swc"]);

    assert!(result.is_err());
}

#[test]
fn given_verbose_flag_when_parsed_then_logs_at_trace() {
    let quiet = Cli::try_parse_from(["adl-harness", "--library", "A.swc", "Form.mxml"]).unwrap();
    let verbose =
        Cli::try_parse_from(["adl-harness", "-v", "--library", "A.swc", "Form.mxml"]).unwrap();

    assert_eq!(quiet.log_level(), crate::logger::DEFAULT_LOG_LEVEL);
    assert_eq!(verbose.log_level(), log::LevelFilter::Trace);
}

/// **VALUE**: Verifies SDK libraries alone satisfy the library requirement.
///
/// **WHY THIS MATTERS**: A document that only uses the framework has no user libraries to
/// pass, but still needs a library set.
///
/// **BUG THIS CATCHES**: Would catch `--library` staying required, or SDK libraries being
/// parsed into the user list.
#[test]
fn given_only_sdk_libraries_when_parsed_then_accepted_and_kept_apart() {
    // GIVEN/WHEN: One SDK library and no user library
    let cli = Cli::try_parse_from([
        "adl-harness",
        "--sdk-library",
        "sdk/framework.swc",
        "Form.mxml",
    ])
    .unwrap();

    // THEN: Parsed into the SDK list only
    assert_eq!(cli.sdk_libraries, vec![PathBuf::from("sdk/framework.swc")]);
    assert!(cli.libraries.is_empty());
}

#[test]
fn given_no_libraries_when_parsed_then_rejected() {
    let result = Cli::try_parse_from(["adl-harness", "Form.mxml"]);

    assert!(result.is_err());
}
