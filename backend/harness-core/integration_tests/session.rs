use crate::helpers::{
    Behavior, LOCATION_HASH, MODULE_NAME, PROJECT_NAME, Reply, SimulatedLauncher, document,
    fixture, oversized_setup, setup,
};

use harness_core::codec::worker::{
    ClientMessage, encode_calibration, encode_pass, encode_style_source_request,
};
use harness_core::codec::{StyleSourceRequest, TestTarget};
use harness_core::driver::{
    InteractionReplay, InteractiveTest, ReplayError, StyleSource, StyleSourceAssertion,
    StyleSourceResolver,
};
use harness_core::error::{LaunchError, SessionError};
use harness_core::registration::StyleHolderCollector;
use harness_core::{BatchSelection, HarnessError, HarnessSession, Tester, run_session};

use models::{
    LibraryDescriptor, LocalStyleHolder, ModuleDescriptor, ModuleId, StageOffset, TestOutcome,
    UnitResult,
};

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Public API tests for a full harness session against a simulated worker
// ============================================================================

// ----------------------------------------------------------------------------
// Setup and registration
// ----------------------------------------------------------------------------

/// **VALUE**: End-to-end happy path: libraries, module, one document, one pass.
///
/// **WHY THIS MATTERS**: This is the sequence every real session goes through. The worker
/// must see the project, then `A.swc` before `B.swc`, then the module bound to that set,
/// then the document and its test against the `fixtures` group.
///
/// **BUG THIS CATCHES**: Would catch registration order drift, library reordering, the
/// test command carrying the file name instead of the document name, or the elapsed time
/// not being recorded.
#[tokio::test]
async fn given_passing_worker_when_single_document_run_then_registers_in_order_and_passes() {
    // GIVEN: A worker that passes every test
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|_| Reply::Pass);
    let setup = setup();

    // WHEN: Running Form.mxml
    let report = run_session(&fixture.config, &launcher, &setup, |session| {
        Box::pin(async move {
            session
                .run_batch(MODULE_NAME, vec![document("Form.mxml")], BatchSelection::All, |_| {
                    Tester::Standard
                })
                .await
        })
    })
    .await
    .unwrap();

    // THEN: One pass with elapsed time, and the worker saw the state in order
    assert_eq!(report.passed(), 1);
    assert!(matches!(
        report.reports()[0].result,
        UnitResult::Completed(TestOutcome::Passed { elapsed: Some(_) })
    ));

    let received = launcher.received();
    assert_eq!(
        received[0],
        ClientMessage::OpenProject {
            name: PROJECT_NAME.to_string(),
            location_hash: LOCATION_HASH.to_string(),
        }
    );
    match &received[1] {
        ClientMessage::RegisterLibrarySet { id, libraries, .. } => {
            assert_eq!(id, LOCATION_HASH);
            let paths: Vec<&str> = libraries.iter().map(LibraryDescriptor::path).collect();
            assert_eq!(paths, vec!["/libs/A.swc", "/libs/B.swc"]);
        }
        other => panic!("Expected RegisterLibrarySet, got {other:?}"),
    }
    assert_eq!(
        received[2],
        ClientMessage::RegisterModule {
            module_id: 0,
            name: MODULE_NAME.to_string(),
            library_set_ids: vec![LOCATION_HASH.to_string()],
            local_style_holders: Vec::new(),
        }
    );
    assert!(matches!(
        &received[3],
        ClientMessage::OpenDocument { module_id: 0, file_name, .. } if file_name == "Form.mxml"
    ));
    assert_eq!(
        received[4],
        ClientMessage::Test {
            document: "Form".to_string(),
            target: TestTarget::Group("fixtures".to_string()),
        }
    );
}

/// **VALUE**: Verifies a worker that exits with code 1 fails setup with `adl return 1`.
///
/// **WHY THIS MATTERS**: A broken runtime install makes `adl` exit immediately. Without the
/// exit race the harness would wait for a connection that never comes.
///
/// **BUG THIS CATCHES**: Would catch accept ignoring the exit signal, or the exit code
/// being lost from the message.
#[tokio::test]
async fn given_worker_exits_with_code_1_when_session_started_then_fails_with_adl_return() {
    // GIVEN: A worker that exits with 1 right away
    let fixture = fixture();
    let launcher = SimulatedLauncher::new(Behavior::Exit(1));

    // WHEN: Starting a session
    let result = HarnessSession::start(&fixture.config, &launcher, &setup()).await;

    // THEN: Setup fails with "adl return 1" and nothing was tested
    let error = match result {
        Err(error) => error,
        Ok(_) => panic!("Session should not start"),
    };
    assert!(error.to_string().contains("adl return 1"), "{error}");
    assert!(matches!(
        error,
        HarnessError::Launch(LaunchError::Exited { code: Some(1), .. })
    ));
    assert!(launcher.received().is_empty());
}

#[tokio::test]
async fn given_worker_exits_cleanly_before_connecting_when_session_started_then_fails() {
    // GIVEN: A worker that exits with 0 without connecting
    let fixture = fixture();
    let launcher = SimulatedLauncher::new(Behavior::Exit(0));

    // WHEN: Starting a session
    let result = HarnessSession::start(&fixture.config, &launcher, &setup()).await;

    // THEN: Still a launch error
    assert!(matches!(
        result,
        Err(HarnessError::Launch(LaunchError::Exited { code: Some(0), .. }))
    ));
}

/// **VALUE**: Verifies the rendezvous gives up when the worker never connects.
///
/// **WHY THIS MATTERS**: A worker that hangs during startup would otherwise block the test
/// run forever.
///
/// **BUG THIS CATCHES**: Would catch an accept without a timeout.
#[tokio::test]
async fn given_worker_never_connects_when_session_started_then_accept_times_out() {
    // GIVEN: A worker that stays alive without connecting, and a 1s accept timeout
    let mut fixture = fixture();
    fixture.config.accept_timeout_secs = 1;
    let launcher = SimulatedLauncher::new(Behavior::NeverConnect);

    // WHEN: Starting a session
    let started = Instant::now();
    let result = HarnessSession::start(&fixture.config, &launcher, &setup()).await;

    // THEN: AcceptTimeout, well before any default timeout
    assert!(matches!(
        result,
        Err(HarnessError::Launch(LaunchError::AcceptTimeout { .. }))
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// **VALUE**: Verifies registration gives up on a worker that connected but stopped reading.
///
/// **WHY THIS MATTERS**: A wedged worker fills the socket buffers and blocks the write. Setup
/// has to fail and tear down instead of hanging with the worker still running.
///
/// **BUG THIS CATCHES**: Would catch registration or channel close writing without a deadline.
#[tokio::test]
async fn given_worker_stops_reading_when_state_registered_then_setup_fails_as_stalled() {
    // GIVEN: A worker that connects and never reads, a setup too large to buffer, a 1s deadline
    let mut fixture = fixture();
    fixture.config.unit_timeout_secs = 1;
    let launcher = SimulatedLauncher::new(Behavior::ConnectIdle);

    // WHEN: Starting a session
    let started = Instant::now();
    let result = HarnessSession::start(&fixture.config, &launcher, &oversized_setup()).await;

    // THEN: Stalled, with setup and teardown each bounded by the deadline
    assert!(matches!(
        result,
        Err(HarnessError::Session(SessionError::Stalled { .. }))
    ));
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test]
async fn given_session_started_when_launched_then_worker_gets_derived_paths() {
    // GIVEN: A passing worker
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|_| Reply::Pass);

    // WHEN: Starting and shutting down a session
    let session = HarnessSession::start(&fixture.config, &launcher, &setup())
        .await
        .unwrap();
    let app_root = launcher.launched().unwrap().app_root().to_path_buf();
    let app_root_existed = app_root.join("designer.swf").exists();
    session.shutdown().await;

    // THEN: The loader was installed in a temporary app root that is gone afterwards
    let launched = launcher.launched().unwrap();
    assert!(launched.plugin_swf().starts_with(fixture.home.path()));
    assert_ne!(launched.port(), 0);
    assert!(app_root_existed, "designer.swf should be installed");
    assert!(!app_root.exists(), "temporary app root should be removed");
}

struct FixedHolders;

impl StyleHolderCollector for FixedHolders {
    fn collect(&self, _: &ModuleDescriptor) -> Vec<LocalStyleHolder> {
        vec![LocalStyleHolder {
            path: "/src/Form.mxml".to_string(),
            style_names: vec!["highlight".to_string()],
        }]
    }
}

/// **VALUE**: Verifies deferred module registration carries the collected style holders.
///
/// **WHY THIS MATTERS**: Documents with local styles only render correctly if the worker
/// knows the module's style holders before the first document opens.
///
/// **BUG THIS CATCHES**: Would catch the module being registered at setup without holders,
/// or not registered at all before `OpenDocument`.
#[tokio::test]
async fn given_style_holder_collection_when_first_document_runs_then_module_registered_with_holders() {
    // GIVEN: A setup that requires local style holders
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|_| Reply::Pass);
    let setup = setup().with_local_style_holders(Arc::new(FixedHolders));

    // WHEN: Running one document
    run_session(&fixture.config, &launcher, &setup, |session| {
        Box::pin(async move {
            session
                .run_batch(MODULE_NAME, vec![document("Form.mxml")], BatchSelection::All, |_| {
                    Tester::Standard
                })
                .await
        })
    })
    .await
    .unwrap();

    // THEN: The module arrives after the library set, with its holders, before the document
    let received = launcher.received();
    assert!(matches!(received[1], ClientMessage::RegisterLibrarySet { .. }));
    match &received[2] {
        ClientMessage::RegisterModule {
            local_style_holders,
            ..
        } => assert_eq!(local_style_holders.len(), 1),
        other => panic!("Expected RegisterModule, got {other:?}"),
    }
    assert!(matches!(received[3], ClientMessage::OpenDocument { .. }));
}

// ----------------------------------------------------------------------------
// Batches
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies a failing document is reported and the next one still runs.
///
/// **WHY THIS MATTERS**: A test failure is a result, not a session error. Stopping at the
/// first failure would hide every later regression.
///
/// **BUG THIS CATCHES**: Would catch failures being raised as errors, or the reason losing
/// the document name.
#[tokio::test]
async fn given_failing_document_when_batch_run_then_reports_failure_and_continues() {
    // GIVEN: A worker that fails Button and passes everything else
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|document| {
        if document == "Button" {
            Reply::Fail("style mismatch".to_string())
        } else {
            Reply::Pass
        }
    });

    // WHEN: Running Button.mxml then Form.mxml
    let report = run_session(&fixture.config, &launcher, &setup(), |session| {
        Box::pin(async move {
            session
                .run_batch(
                    MODULE_NAME,
                    vec![document("Button.mxml"), document("Form.mxml")],
                    BatchSelection::All,
                    |_| Tester::Standard,
                )
                .await
        })
    })
    .await
    .unwrap();

    // THEN: One failure with the joined reason, one pass
    assert_eq!(report.failed(), 1);
    assert_eq!(report.passed(), 1);
    assert_eq!(
        report.failures().collect::<Vec<_>>(),
        vec!["Button\nstyle mismatch"]
    );
    assert_eq!(launcher.tested(), vec!["Button", "Form"]);
}

#[tokio::test]
async fn given_last_only_batch_with_non_artifact_when_run_then_tests_only_last_document() {
    // GIVEN: Two auxiliary files and the target
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|_| Reply::Pass);

    // WHEN: Running with LastOnly
    let report = run_session(&fixture.config, &launcher, &setup(), |session| {
        Box::pin(async move {
            session
                .run_batch(
                    MODULE_NAME,
                    vec![document("Aux.mxml"), document("styles.css"), document("Form.mxml")],
                    BatchSelection::LastOnly,
                    |_| Tester::Standard,
                )
                .await
        })
    })
    .await
    .unwrap();

    // THEN: Only Form is tested, the other two are skipped
    assert_eq!(launcher.tested(), vec!["Form"]);
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.passed(), 1);
}

/// **VALUE**: Verifies non-artifact files are skipped, not failed, in a full batch.
///
/// **WHY THIS MATTERS**: Test directories contain stylesheets and assets next to the
/// documents. Reporting them as failures would make every such directory red.
///
/// **BUG THIS CATCHES**: Would catch the artifact filter being bypassed for `All`.
#[tokio::test]
async fn given_stylesheet_in_batch_when_run_then_skipped_not_failed() {
    // GIVEN: A stylesheet before a document
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|_| Reply::Pass);

    // WHEN: Running all documents
    let report = run_session(&fixture.config, &launcher, &setup(), |session| {
        Box::pin(async move {
            session
                .run_batch(
                    MODULE_NAME,
                    vec![document("styles.css"), document("Form.mxml")],
                    BatchSelection::All,
                    |_| Tester::Standard,
                )
                .await
        })
    })
    .await
    .unwrap();

    // THEN: Skipped and passed, nothing failed
    assert_eq!(report.reports()[0].result, UnitResult::Skipped);
    assert_eq!(report.failed(), 0);
    assert!(report.is_success());
}

// ----------------------------------------------------------------------------
// Deadlines and worker faults
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies a withheld result fails exactly that document within the deadline
/// and poisons the session.
///
/// **WHY THIS MATTERS**: A stuck worker must not hang the run. After the timeout the
/// channel position is unknown, so later documents must not run on it.
///
/// **BUG THIS CATCHES**: Would catch a read without a deadline, a timeout that names the
/// wrong document, or a session that keeps using the abandoned channel.
#[tokio::test]
async fn given_worker_withholds_result_when_batch_run_then_times_out_and_poisons_session() {
    // GIVEN: A worker that never answers Stuck, and a 1s unit deadline
    let mut fixture = fixture();
    fixture.config.unit_timeout_secs = 1;
    let launcher = SimulatedLauncher::serving(|document| {
        if document == "Stuck" {
            Reply::Silent
        } else {
            Reply::Pass
        }
    });
    let mut session = HarnessSession::start(&fixture.config, &launcher, &setup())
        .await
        .unwrap();

    // WHEN: Running Stuck, then trying another batch
    let started = Instant::now();
    let result = session
        .run_batch(
            MODULE_NAME,
            vec![document("Stuck.mxml"), document("Form.mxml")],
            BatchSelection::All,
            |_| Tester::Standard,
        )
        .await;
    let waited = started.elapsed();
    let next = session
        .run_batch(
            MODULE_NAME,
            vec![document("Form.mxml")],
            BatchSelection::All,
            |_| Tester::Standard,
        )
        .await;
    session.shutdown().await;

    // THEN: Timeout naming Stuck, then Poisoned; Form never reached the worker
    match result {
        Err(HarnessError::Session(SessionError::Timeout { document, .. })) => {
            assert_eq!(document, "Stuck")
        }
        other => panic!("Expected a timeout, got {other:?}"),
    }
    assert!(waited >= Duration::from_secs(1));
    assert!(waited < Duration::from_secs(4));
    assert!(matches!(
        next,
        Err(HarnessError::Session(SessionError::Poisoned { .. }))
    ));
    assert_eq!(launcher.tested(), vec!["Stuck"]);
}

/// **VALUE**: Verifies a timeout keeps the results of the run: earlier passes survive and
/// the stuck document is reported as failed.
///
/// **WHY THIS MATTERS**: The caller logs and counts from the report. Losing it on a timeout
/// would turn a run with a failure into one that shows no results, or even a success.
///
/// **BUG THIS CATCHES**: Would catch the timed-out document missing from the report, or
/// the report being discarded when the session ends on an error.
#[tokio::test]
async fn given_pass_then_withheld_result_when_session_run_then_failure_keeps_both_results() {
    // GIVEN: A worker that passes Form and never answers Stuck, and a 1s unit deadline
    let mut fixture = fixture();
    fixture.config.unit_timeout_secs = 1;
    let launcher = SimulatedLauncher::serving(|document| {
        if document == "Stuck" {
            Reply::Silent
        } else {
            Reply::Pass
        }
    });

    // WHEN: Running Form.mxml then Stuck.mxml
    let result = run_session(&fixture.config, &launcher, &setup(), |session| {
        Box::pin(async move {
            session
                .run_batch(
                    MODULE_NAME,
                    vec![document("Form.mxml"), document("Stuck.mxml")],
                    BatchSelection::All,
                    |_| Tester::Standard,
                )
                .await
        })
    })
    .await;

    // THEN: The timeout is returned with Form passed and Stuck failed
    let failure = match result {
        Err(failure) => failure,
        Ok(report) => panic!("Expected a timeout, got {report:?}"),
    };
    assert!(matches!(
        failure.error,
        HarnessError::Session(SessionError::Timeout { .. })
    ));

    let report = failure.report;
    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());
    assert_eq!(report.reports()[0].document, "Form");
    assert!(matches!(
        report.reports()[0].result,
        UnitResult::Completed(TestOutcome::Passed { .. })
    ));
    assert_eq!(report.reports()[1].document, "Stuck");
    let reasons: Vec<&str> = report.failures().collect();
    assert!(reasons[0].starts_with("Stuck\nTimeout Error"), "{}", reasons[0]);
}

#[tokio::test]
async fn given_worker_exits_during_test_when_batch_run_then_fails_with_adl_return() {
    // GIVEN: A worker that exits with 1 when asked to test Crash
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|document| {
        if document == "Crash" {
            Reply::Exit(1)
        } else {
            Reply::Pass
        }
    });

    // WHEN: Running Crash
    let result = run_session(&fixture.config, &launcher, &setup(), |session| {
        Box::pin(async move {
            session
                .run_batch(
                    MODULE_NAME,
                    vec![document("Crash.mxml")],
                    BatchSelection::All,
                    |_| Tester::Standard,
                )
                .await
        })
    })
    .await;

    // THEN: The session error carries the exit code, and Crash is reported as failed
    match result {
        Err(failure) => {
            assert!(failure.to_string().contains("adl return 1"), "{failure}");
            assert!(matches!(
                failure.error,
                HarnessError::Launch(LaunchError::Exited { code: Some(1), .. })
            ));
            assert_eq!(failure.report.failed(), 1);
            assert_eq!(failure.report.reports()[0].document, "Crash");
        }
        Ok(report) => panic!("Expected an error, got {report:?}"),
    }
}

// ----------------------------------------------------------------------------
// Interactive tests
// ----------------------------------------------------------------------------

struct NoReplay;

impl InteractionReplay for NoReplay {
    fn perform(&self, _: &Path, _: usize, _: StageOffset) -> Result<(), ReplayError> {
        Ok(())
    }
}

/// Resolves every request to the last button skin at its real offset.
struct SkinResolver;

impl StyleSourceResolver for SkinResolver {
    fn resolve(&self, _: &ModuleDescriptor, request: &StyleSourceRequest) -> Option<StyleSource> {
        (request.property == "skinClass").then(|| StyleSource {
            value: "spark.skins.spark.ButtonBarLastButtonSkin".to_string(),
            text_offset: 2186,
        })
    }
}

fn style_navigation_reply() -> Reply {
    let request = StyleSourceRequest {
        module: ModuleId::new(0),
        document: "Form".to_string(),
        element_type: "spark.components.ButtonBarButton".to_string(),
        property: "skinClass".to_string(),
        value: "ButtonBarLastButtonSkin".to_string(),
    };
    Reply::Bytes(
        [
            encode_pass(),
            encode_calibration(StageOffset { x: 40, y: 60 }, true),
            encode_style_source_request(&request).unwrap(),
        ]
        .concat(),
    )
}

fn style_navigation(expected: &str) -> Tester {
    Tester::Interactive(
        InteractiveTest::new(
            5,
            "scripts/styleNavigation.txt",
            Arc::new(NoReplay),
            Arc::new(SkinResolver),
        )
        .with_assertion(StyleSourceAssertion::new(expected, 2186)),
    )
}

/// **VALUE**: End-to-end interactive style navigation against the worker.
///
/// **WHY THIS MATTERS**: Navigation from a rendered component to its style declaration is
/// verified only through this exchange. Both the expected and an unexpected value must be
/// decided correctly.
///
/// **BUG THIS CATCHES**: Would catch the variant not being sent, the calibration record
/// being left on the stream, or any value being accepted.
#[tokio::test]
async fn given_style_navigation_when_interactive_test_run_then_checks_resolved_value() {
    // GIVEN: A worker answering with calibration and a style source request
    let fixture = fixture();
    let launcher = SimulatedLauncher::serving(|_| style_navigation_reply());

    // WHEN: Running Form with the right expectation, then Other with a wrong one
    let report = run_session(&fixture.config, &launcher, &setup(), |session| {
        Box::pin(async move {
            let first = session
                .run_batch(MODULE_NAME, vec![document("Form.mxml")], BatchSelection::All, |_| {
                    style_navigation("spark.skins.spark.ButtonBarLastButtonSkin")
                })
                .await?;
            assert_eq!(first.passed(), 1, "{first:?}");
            assert!(matches!(
                first.reports()[0].result,
                UnitResult::Completed(TestOutcome::Passed { elapsed: None })
            ));
            session
                .run_batch(MODULE_NAME, vec![document("Other.mxml")], BatchSelection::All, |_| {
                    style_navigation("spark.skins.spark.ButtonBarFirstButtonSkin")
                })
                .await
        })
    })
    .await
    .unwrap();

    // THEN: The second batch failed on the value, and both tested variant 5
    assert_eq!(report.failed(), 1);
    assert!(report.failures().all(|reason| reason.starts_with("Other\n")));
    let variants: Vec<TestTarget> = launcher
        .received()
        .into_iter()
        .filter_map(|message| match message {
            ClientMessage::Test { target, .. } => Some(target),
            _ => None,
        })
        .collect();
    assert_eq!(variants, vec![TestTarget::Variant(5), TestTarget::Variant(5)]);
}
