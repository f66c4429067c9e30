use harness_core::HarnessConfig;
use harness_core::config::{
    AppRoot, DESCRIPTOR_FILE, DESIGNER_SWF, ENV_ACCEPT_TIMEOUT_SECS, ENV_HOME, ENV_TEST_DEBUG,
    ENV_UNIT_TIMEOUT_SECS, ENV_VARIABLES,
};
use harness_core::error::ConfigError;
use harness_core::{CONFIG_FILE_NAME, PLUGIN_SWF_PATH};

use crate::helpers::fixture;

use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use uuid::Uuid;

// ============================================================================
// Public API tests for configuration loading
// ============================================================================

fn clear_env() {
    for variable in ENV_VARIABLES {
        // SAFETY: every test touching the environment is #[serial].
        unsafe { std::env::remove_var(variable) };
    }
}

// ----------------------------------------------------------------------------
// File loading
// ----------------------------------------------------------------------------

#[test]
fn given_no_config_file_when_loaded_then_defaults() {
    // GIVEN: An empty directory
    let dir = tempfile::tempdir().unwrap();

    // WHEN: Loading
    let config = HarnessConfig::load(dir.path()).unwrap();

    // THEN: Defaults, including the 8 second unit deadline
    assert_eq!(config, HarnessConfig::default());
    assert_eq!(config.unit_timeout(), Duration::from_secs(8));
    assert!(!config.debug);
}

/// **VALUE**: Verifies a partial config file keeps defaults for omitted fields.
///
/// **WHY THIS MATTERS**: Most users set only `home` and `air`. Requiring every field would
/// make the file a copy of the defaults that silently drifts from them.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[serde(default)]` on any field.
#[test]
fn given_partial_config_file_when_loaded_then_missing_fields_default() {
    // GIVEN: A file setting only home and the unit timeout
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{ "home": "/opt/designer", "unit_timeout_secs": 12 }"#,
    )
    .unwrap();

    // WHEN: Loading
    let config = HarnessConfig::load(dir.path()).unwrap();

    // THEN: Given fields applied, the rest default
    assert_eq!(config.home, Some(PathBuf::from("/opt/designer")));
    assert_eq!(config.unit_timeout_secs, 12);
    assert_eq!(config.accept_timeout_secs, 30);
    assert_eq!(config.max_concurrent_units, 1);
    assert_eq!(
        config.plugin_swf().unwrap(),
        PathBuf::from("/opt/designer").join(PLUGIN_SWF_PATH)
    );
}

#[test]
fn given_malformed_config_file_when_loaded_then_parse_error() {
    // GIVEN: A file that is not JSON
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "home = /opt").unwrap();

    // WHEN: Loading
    let result = HarnessConfig::load(dir.path());

    // THEN: Parse error naming the file
    match result {
        Err(ConfigError::ParseError { path, .. }) => {
            assert!(path.ends_with(CONFIG_FILE_NAME))
        }
        other => panic!("Expected a parse error, got {other:?}"),
    }
}

#[test]
fn given_explicit_missing_file_when_loaded_then_read_error() {
    let dir = tempfile::tempdir().unwrap();

    let result = HarnessConfig::load_file(&dir.path().join("missing.json"));

    assert!(matches!(result, Err(ConfigError::ReadError { .. })));
}

// ----------------------------------------------------------------------------
// Validation and required settings
// ----------------------------------------------------------------------------

#[test]
fn given_zero_unit_timeout_when_validated_then_rejected() {
    let config = HarnessConfig {
        unit_timeout_secs: 0,
        ..HarnessConfig::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

#[test]
fn given_invalid_artifact_pattern_when_validated_then_rejected() {
    let config = HarnessConfig {
        artifact_pattern: "(".to_string(),
        ..HarnessConfig::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError { .. })
    ));
}

/// **VALUE**: Verifies missing locations are reported by the variable that sets them.
///
/// **WHY THIS MATTERS**: The first run on a new machine always lacks these. The error
/// should tell the user which variable to export.
///
/// **BUG THIS CATCHES**: Would catch a panic or an empty path being passed to `adl`.
#[test]
fn given_no_home_or_air_when_launch_config_built_then_missing_setting() {
    // GIVEN: Defaults only
    let config = HarnessConfig::default();

    // WHEN: Resolving the locations
    let home = config.home();
    let air = config.runtime();

    // THEN: Each names its variable
    assert!(matches!(home, Err(ConfigError::MissingSetting { setting, .. }) if setting == ENV_HOME));
    assert!(matches!(air, Err(ConfigError::MissingSetting { setting, .. }) if setting == "FUD_AIR"));
    assert!(config.launch_config(4000, &PathBuf::from("/tmp/root")).is_err());
}

// ----------------------------------------------------------------------------
// Environment overrides
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies environment variables override the file.
///
/// **WHY THIS MATTERS**: CI machines configure the harness only through `FUD_*` variables
/// on top of a checked-in file.
///
/// **BUG THIS CATCHES**: Would catch a variable being read but not applied, or the file
/// winning over the environment.
#[test]
#[serial]
fn given_env_overrides_when_applied_then_env_wins_over_file() {
    // GIVEN: A file with a 12s timeout and the environment saying 3s and debug
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{ "unit_timeout_secs": 12 }"#,
    )
    .unwrap();
    // SAFETY: serialized with every other environment test.
    unsafe {
        std::env::set_var(ENV_UNIT_TIMEOUT_SECS, "3");
        std::env::set_var(ENV_TEST_DEBUG, "true");
        std::env::set_var(ENV_HOME, "/srv/designer");
    }

    // WHEN: Loading and applying the environment
    let config = HarnessConfig::load(dir.path()).unwrap().apply_env();
    clear_env();

    // THEN: Environment values win
    let config = config.unwrap();
    assert_eq!(config.unit_timeout_secs, 3);
    assert!(config.debug);
    assert_eq!(config.home, Some(PathBuf::from("/srv/designer")));
}

#[test]
#[serial]
fn given_non_numeric_timeout_env_when_applied_then_env_error() {
    // GIVEN: A timeout that is not a number
    clear_env();
    // SAFETY: serialized with every other environment test.
    unsafe { std::env::set_var(ENV_ACCEPT_TIMEOUT_SECS, "soon") };

    // WHEN: Applying the environment
    let result = HarnessConfig::default().apply_env();
    clear_env();

    // THEN: Env error naming the variable
    match result {
        Err(ConfigError::EnvError { variable, .. }) => assert_eq!(variable, ENV_ACCEPT_TIMEOUT_SECS),
        other => panic!("Expected an env error, got {other:?}"),
    }
}

#[test]
#[serial]
fn given_empty_env_value_when_applied_then_treated_as_unset() {
    // GIVEN: An empty debug flag
    clear_env();
    // SAFETY: serialized with every other environment test.
    unsafe { std::env::set_var(ENV_TEST_DEBUG, "") };

    // WHEN: Applying the environment
    let result = HarnessConfig::default().apply_env();
    clear_env();

    // THEN: Default kept
    assert!(!result.unwrap().debug);
}

// ----------------------------------------------------------------------------
// App root preparation
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the debug app root is installed once and then reused.
///
/// **WHY THIS MATTERS**: Debug mode exists so a developer can attach to a stable app root
/// between runs. Reinstalling would wipe their local edits to the descriptor.
///
/// **BUG THIS CATCHES**: Would catch the debug root being treated as temporary and removed.
#[cfg(not(windows))]
#[test]
fn given_debug_mode_when_prepared_twice_then_root_installed_once_and_kept() {
    // GIVEN: Debug mode with a root that does not exist yet
    let mut fixture = fixture();
    fixture.config.debug = true;
    let root = fixture.config.debug_app_root.clone();

    // WHEN: Preparing, editing the descriptor, and preparing again
    let first = AppRoot::prepare(&fixture.config, Uuid::new_v4()).unwrap();
    assert!(root.join(DESIGNER_SWF).exists());
    std::fs::write(root.join(DESCRIPTOR_FILE), "edited").unwrap();
    first.release();
    let second = AppRoot::prepare(&fixture.config, Uuid::new_v4()).unwrap();
    let path = second.path().to_path_buf();
    second.release();

    // THEN: Same root, still present, edit preserved
    assert_eq!(path, root);
    assert_eq!(
        std::fs::read_to_string(root.join(DESCRIPTOR_FILE)).unwrap(),
        "edited"
    );
}

#[test]
fn given_normal_mode_when_prepared_then_temporary_root_with_loader_only() {
    // GIVEN: Non-debug mode
    let fixture = fixture();

    // WHEN: Preparing and releasing
    let root = AppRoot::prepare(&fixture.config, Uuid::new_v4()).unwrap();
    let path = root.path().to_path_buf();
    let has_loader = path.join(DESIGNER_SWF).exists();
    let has_descriptor = path.join(DESCRIPTOR_FILE).exists();
    root.release();

    // THEN: Loader installed, descriptor not copied, removed afterwards
    assert!(has_loader);
    assert!(!has_descriptor);
    assert!(!path.exists());
}

#[test]
fn given_missing_loader_when_prepared_then_app_root_error() {
    // GIVEN: A home without the app loader
    let home = tempfile::tempdir().unwrap();
    let config = HarnessConfig {
        home: Some(home.path().to_path_buf()),
        ..HarnessConfig::default()
    };

    // WHEN: Preparing
    let result = AppRoot::prepare(&config, Uuid::new_v4());

    // THEN: Fails instead of launching a worker without a loader
    assert!(result.is_err());
}
