// Unit tests for the worker command line
// Process supervision is tested through the public API in integration_tests/supervisor.rs

use crate::supervisor::build_adl_command;

use models::LaunchConfigBuilder;

use std::ffi::OsStr;

/// **VALUE**: Verifies the exact argument order handed to `adl`.
///
/// **WHY THIS MATTERS**: `adl` is positional before `--` and flag-based after it; the port
/// must be the first application argument or the worker dials the wrong address.
///
/// **BUG THIS CATCHES**: Would catch the descriptor and app root being swapped, or the
/// port landing before the separator.
#[test]
fn given_launch_config_when_command_built_then_arguments_follow_adl_contract() {
    // GIVEN: A complete launch config
    let config = LaunchConfigBuilder::default()
        .with_executable("/opt/air/bin/adl")
        .with_runtime("/opt/air/runtime")
        .with_plugin_swf("/fud/test-app-plugin/target/test-1.0-SNAPSHOT.swf")
        .with_content_dir("/fud/flex-injection/target")
        .with_descriptor("/fud/designer/src/main/resources/descriptor.xml")
        .with_port(51234)
        .with_app_root("/tmp/fud-app")
        .build()
        .unwrap();

    // WHEN: Building the command
    let cmd = build_adl_command(&config);

    // THEN: Program and arguments match the adl contract
    let std_cmd = cmd.as_std();
    assert_eq!(std_cmd.get_program(), OsStr::new("/opt/air/bin/adl"));
    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    let expected = [
        "-runtime",
        "/opt/air/runtime",
        "/fud/designer/src/main/resources/descriptor.xml",
        "/tmp/fud-app",
        "--",
        "51234",
        "-p",
        "/fud/test-app-plugin/target/test-1.0-SNAPSHOT.swf",
        "-cdd",
        "/fud/flex-injection/target",
    ];
    assert_eq!(args, expected.iter().map(OsStr::new).collect::<Vec<_>>());
}
