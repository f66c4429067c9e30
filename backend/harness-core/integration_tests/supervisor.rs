use harness_core::error::LaunchError;
use harness_core::{AdlLauncher, WorkerExit, WorkerLauncher, WorkerProcess};

use models::LaunchConfigBuilder;

use std::future::pending;
use std::time::Duration;

use tokio::time::timeout;

// ============================================================================
// Public API tests for worker supervision
// ============================================================================

// ----------------------------------------------------------------------------
// WorkerExit
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the exit-to-error mapping the session reports to the user.
///
/// **WHY THIS MATTERS**: `adl return N` is the message people grep CI logs for when the
/// runtime is broken. A clean exit or a harness kill must not be reported as a failure.
///
/// **BUG THIS CATCHES**: Would catch a kill during teardown being surfaced as an error, or
/// the exit code being dropped from the message.
#[test]
fn given_worker_exits_when_failure_checked_then_only_real_failures_are_errors() {
    // GIVEN/WHEN/THEN: Each kind of exit
    assert!(WorkerExit::Code(0).failure().is_none());
    assert!(WorkerExit::Terminated.failure().is_none());

    let failure = WorkerExit::Code(3).failure().unwrap();
    assert!(failure.to_string().contains("adl return 3"), "{failure}");
    assert!(matches!(failure, LaunchError::Exited { code: Some(3), .. }));

    let signal = WorkerExit::Signal.failure().unwrap();
    assert!(matches!(signal, LaunchError::Exited { code: None, .. }));
}

#[test]
fn given_clean_exit_when_unexpected_then_error_names_context() {
    // GIVEN: A worker that exited with 0 while still needed
    let exit = WorkerExit::Code(0);

    // WHEN: Reporting it
    let error = exit.unexpected("before connecting");

    // THEN: Still an error, and it says when it happened
    assert!(error.to_string().contains("before connecting"), "{error}");
    assert_eq!(exit.code(), Some(0));
}

// ----------------------------------------------------------------------------
// WorkerProcess
// ----------------------------------------------------------------------------

#[tokio::test]
async fn given_future_worker_when_it_returns_then_exit_code_is_published() {
    // GIVEN: A worker future that returns 7
    let worker = WorkerProcess::from_future("simulated", async { 7 });

    // WHEN: Waiting for it
    let exit = worker.wait_for_exit().await;

    // THEN: Code 7 is observable both ways
    assert_eq!(exit, WorkerExit::Code(7));
    assert_eq!(worker.exit_status(), Some(WorkerExit::Code(7)));
    assert!(worker.failure().is_some());
    assert!(worker.id().is_none());
}

/// **VALUE**: Verifies terminate is idempotent.
///
/// **WHY THIS MATTERS**: Teardown runs after setup failures and after normal shutdown,
/// sometimes on a worker that is already gone. It must never hang or error on a second call.
///
/// **BUG THIS CATCHES**: Would catch a second terminate waiting on a monitor that already
/// finished.
#[tokio::test]
async fn given_running_worker_when_terminated_twice_then_both_calls_succeed() {
    // GIVEN: A worker that never finishes
    let mut worker = WorkerProcess::from_future("simulated", pending::<i32>());

    // WHEN: Terminating twice
    let first = timeout(Duration::from_secs(2), worker.terminate()).await;
    let second = timeout(Duration::from_secs(2), worker.terminate()).await;

    // THEN: Both return promptly and the exit is Terminated
    assert!(matches!(first, Ok(Ok(()))));
    assert!(matches!(second, Ok(Ok(()))));
    assert_eq!(worker.exit_status(), Some(WorkerExit::Terminated));
}

#[tokio::test]
async fn given_exited_worker_when_terminated_then_exit_is_kept() {
    // GIVEN: A worker that already returned 1
    let mut worker = WorkerProcess::from_future("simulated", async { 1 });
    worker.wait_for_exit().await;

    // WHEN: Terminating
    worker.terminate().await.unwrap();

    // THEN: The real exit is not overwritten
    assert_eq!(worker.exit_status(), Some(WorkerExit::Code(1)));
}

#[cfg(unix)]
#[tokio::test]
async fn given_child_exiting_with_code_1_when_supervised_then_code_is_reported() {
    // GIVEN: A child that exits with 1
    let child = tokio::process::Command::new("sh")
        .args(["-c", "exit 1"])
        .spawn()
        .unwrap();
    let worker = WorkerProcess::from_child("sh", child);

    // WHEN: Waiting for it
    let exit = timeout(Duration::from_secs(5), worker.wait_for_exit())
        .await
        .unwrap();

    // THEN: Code 1, and a pid was known
    assert_eq!(exit, WorkerExit::Code(1));
    assert!(worker.id().is_some());
}

/// **VALUE**: Verifies terminate actually kills an OS process.
///
/// **WHY THIS MATTERS**: A leaked `adl` keeps its window open and holds the app root.
///
/// **BUG THIS CATCHES**: Would catch terminate only dropping the handle without killing.
#[cfg(unix)]
#[tokio::test]
async fn given_long_running_child_when_terminated_then_stops_promptly() {
    // GIVEN: A child sleeping for 30 seconds
    let child = tokio::process::Command::new("sleep")
        .arg("30")
        .kill_on_drop(true)
        .spawn()
        .unwrap();
    let mut worker = WorkerProcess::from_child("sleep", child);

    // WHEN: Terminating it
    let result = timeout(Duration::from_secs(5), worker.terminate()).await;

    // THEN: Done well before the sleep would end
    assert!(matches!(result, Ok(Ok(()))));
    assert_eq!(worker.exit_status(), Some(WorkerExit::Terminated));
}

// ----------------------------------------------------------------------------
// AdlLauncher
// ----------------------------------------------------------------------------

#[tokio::test]
async fn given_missing_executable_when_launched_then_spawn_error() {
    // GIVEN: A launch config pointing at an executable that does not exist
    let home = tempfile::tempdir().unwrap();
    let config = LaunchConfigBuilder::default()
        .with_executable(home.path().join("no-such-adl"))
        .with_runtime(home.path().join("air"))
        .with_plugin_swf(home.path().join("plugin.swf"))
        .with_content_dir(home.path().join("content"))
        .with_descriptor(home.path().join("descriptor.xml"))
        .with_port(4000)
        .with_app_root(home.path())
        .build()
        .unwrap();

    // WHEN: Launching
    let result = AdlLauncher::new().launch(&config);

    // THEN: Spawn error naming the executable
    match result {
        Err(LaunchError::Spawn { message, .. }) => assert!(message.contains("no-such-adl")),
        other => panic!("Expected a spawn error, got {other:?}"),
    }
}
