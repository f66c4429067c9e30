use crate::ErrorLocation;

use std::panic::Location;

#[track_caller]
fn desync_site() -> ErrorLocation {
    ErrorLocation::from(Location::caller())
}

/// **VALUE**: Verifies that a location captured through a `#[track_caller]` helper points
/// at the helper's caller.
///
/// **WHY THIS MATTERS**: Codec and supervisor errors are built in small helpers. Without
/// caller tracking every desync would report the helper's line, not the read that failed.
///
/// **BUG THIS CATCHES**: Would catch `#[track_caller]` being dropped from
/// `ErrorLocation::from()` call chains.
#[test]
fn given_track_caller_helper_when_called_twice_then_reports_each_call_site() {
    // WHEN: Capturing from two consecutive lines
    let first = desync_site();
    let second = desync_site();

    // THEN: Same file, consecutive lines
    assert!(first.file.ends_with("error_location.rs"));
    assert_eq!(first.line + 1, second.line);
}

#[test]
fn given_error_location_when_displayed_then_uses_bracketed_file_line_column() {
    let location = ErrorLocation {
        file: "backend/harness-core/src/codec/reader.rs",
        line: 42,
        column: 7,
    };

    assert_eq!(
        location.to_string(),
        "[backend/harness-core/src/codec/reader.rs:42:7]"
    );
}

/// **VALUE**: Verifies locations serialize, since the runner's error type is serialized
/// into its JSON summary.
#[test]
fn given_error_location_when_serialized_then_contains_fields() {
    let location = ErrorLocation {
        file: "session.rs",
        line: 3,
        column: 9,
    };

    let json = serde_json::to_string(&location).expect("serializable");

    assert_eq!(json, r#"{"file":"session.rs","line":3,"column":9}"#);
}
