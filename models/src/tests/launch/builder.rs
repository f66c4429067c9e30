use crate::{LaunchConfigBuilder, ModelError};

fn complete_builder() -> LaunchConfigBuilder {
    LaunchConfigBuilder::default()
        .with_executable("/opt/air/bin/adl")
        .with_runtime("/opt/air/runtime")
        .with_plugin_swf("/fud/test-app-plugin/target/test-1.0-SNAPSHOT.swf")
        .with_content_dir("/fud/flex-injection/target")
        .with_descriptor("/fud/designer/src/main/resources/descriptor.xml")
        .with_port(50123)
        .with_app_root("/tmp/fud-app-root")
}

/// **VALUE**: Verifies that a fully specified builder produces a config with every path intact.
///
/// **BUG THIS CATCHES**: Would catch fields being swapped in `build()` (e.g. runtime and
/// executable), which launches the wrong binary.
#[test]
fn given_all_fields_when_building_then_returns_config() {
    let config = complete_builder().build().expect("complete config");

    assert_eq!(config.executable().to_str(), Some("/opt/air/bin/adl"));
    assert_eq!(config.runtime().to_str(), Some("/opt/air/runtime"));
    assert_eq!(config.port(), 50123);
    assert_eq!(config.app_root().to_str(), Some("/tmp/fud-app-root"));
}

/// **VALUE**: Verifies that port zero is rejected.
///
/// **WHY THIS MATTERS**: Port 0 means "any port" when binding, but the worker needs the
/// concrete port the harness is actually listening on or it never connects back.
#[test]
fn given_zero_port_when_building_then_returns_validation_error() {
    let result = complete_builder().with_port(0).build();

    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Callback port must be non-zero");
        }
        Err(other) => panic!("Expected a validation error, got {other}"),
        Ok(_) => panic!("Port zero should be rejected"),
    }
}

#[test]
fn given_missing_runtime_when_building_then_returns_missing_field_error() {
    let result = LaunchConfigBuilder::default()
        .with_executable("adl")
        .with_plugin_swf("p.swf")
        .with_content_dir("c")
        .with_descriptor("d.xml")
        .with_port(1)
        .with_app_root("r")
        .build();

    match result {
        Err(ModelError::Missing { field, .. }) => assert_eq!(field, "Runtime path"),
        Err(other) => panic!("Expected a missing field error, got {other}"),
        Ok(_) => panic!("Missing runtime should be rejected"),
    }
}

#[test]
fn given_empty_executable_when_building_then_returns_validation_error() {
    let result = complete_builder().with_executable("").build();

    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert_eq!(message, "Executable cannot be empty");
        }
        Err(other) => panic!("Expected a validation error, got {other}"),
        Ok(_) => panic!("Empty executable should be rejected"),
    }
}
