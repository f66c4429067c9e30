// Unit tests for the per-document exchange, run against in-memory streams

use crate::channel::TestClient;
use crate::codec::worker::{
    encode_calibration, encode_failure, encode_pass, encode_style_source_request,
};
use crate::codec::{ResponseReader, StyleSourceRequest};
use crate::driver::{
    ArtifactFilter, BatchSelection, InteractionReplay, InteractiveTest, ReplayError, StyleSource,
    StyleSourceAssertion, StyleSourceResolver, Tester, run_document,
};

use models::{
    DocumentUnit, LibraryDescriptor, LibrarySetBuilder, LibrarySetId, ModuleDescriptor, ModuleId,
    ProjectDescriptor, StageOffset, TestOutcome,
};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::{DuplexStream, duplex};

const EXPECTED_SKIN: &str = "spark.skins.spark.ButtonBarLastButtonSkin";
const EXPECTED_OFFSET: u32 = 2186;

#[derive(Default)]
struct RecordingReplay {
    steps: Mutex<Vec<(PathBuf, usize, StageOffset)>>,
}

impl InteractionReplay for RecordingReplay {
    fn perform(&self, script: &Path, step: usize, offset: StageOffset) -> Result<(), ReplayError> {
        self.steps
            .lock()
            .unwrap()
            .push((script.to_path_buf(), step, offset));
        Ok(())
    }
}

struct FixedResolver(StyleSource);

impl StyleSourceResolver for FixedResolver {
    fn resolve(&self, _: &ModuleDescriptor, _: &StyleSourceRequest) -> Option<StyleSource> {
        Some(self.0.clone())
    }
}

/// A client with one registered module. The command stream's far end is
/// returned so writes never fail.
async fn registered_client() -> (TestClient<DuplexStream>, DuplexStream, ModuleId) {
    let (commands, worker_end) = duplex(64 * 1024);
    let mut client = TestClient::new(commands);
    let project = ProjectDescriptor::new("demo", "demo1a2b3c4d");
    let set = LibrarySetBuilder::default()
        .with_id(LibrarySetId::for_project(&project))
        .with_library(LibraryDescriptor::new("A", "/libs/A.swc", 0, false))
        .build()
        .unwrap();

    client.open_project(&project).await.unwrap();
    client.register_library_set(&set).await.unwrap();
    let module = client
        .register_module(&ModuleDescriptor::new("app"), &[set.id().clone()])
        .await
        .unwrap();
    (client, worker_end, module)
}

fn style_request(module: ModuleId) -> StyleSourceRequest {
    StyleSourceRequest {
        module,
        document: "Form".to_string(),
        element_type: "spark.components.ButtonBar".to_string(),
        property: "lastButton".to_string(),
        value: "ButtonBarLastButtonSkin".to_string(),
    }
}

fn interactive(replay: Arc<RecordingReplay>, resolved: StyleSource) -> Tester {
    Tester::Interactive(
        InteractiveTest::new(
            5,
            "roboflest/styleNavigation.txt",
            replay,
            Arc::new(FixedResolver(resolved)),
        )
        .with_assertion(StyleSourceAssertion::new(EXPECTED_SKIN, EXPECTED_OFFSET)),
    )
}

#[tokio::test]
async fn given_passing_worker_when_standard_document_run_then_passes_with_elapsed() {
    // GIVEN: A worker that answers passed=true
    let (mut client, _worker, module) = registered_client().await;
    let responses = encode_pass();
    let mut reader = ResponseReader::new(&responses[..]);
    let document = DocumentUnit::new("Form.mxml", "fixtures", b"<Form/>".to_vec());

    // WHEN: Running the document with the standard tester
    let outcome = run_document(&mut client, &mut reader, module, &document, &Tester::Standard)
        .await
        .unwrap();

    // THEN: Passed, with the open time recorded
    assert!(matches!(outcome, TestOutcome::Passed { elapsed: Some(_) }));
}

#[tokio::test]
async fn given_failing_worker_when_standard_document_run_then_reason_names_document() {
    // GIVEN: A worker that answers "style mismatch"
    let (mut client, _worker, module) = registered_client().await;
    let responses = encode_failure("style mismatch").unwrap();
    let mut reader = ResponseReader::new(&responses[..]);
    let document = DocumentUnit::new("Button.mxml", "fixtures", b"<Button/>".to_vec());

    // WHEN: Running the document
    let outcome = run_document(&mut client, &mut reader, module, &document, &Tester::Standard)
        .await
        .unwrap();

    // THEN: Failure reason is "Button\nstyle mismatch"
    assert_eq!(
        outcome,
        TestOutcome::Failed {
            reason: "Button\nstyle mismatch".to_string()
        }
    );
}

/// **VALUE**: Verifies the interactive exchange: calibration, replay, request, resolution.
///
/// **WHY THIS MATTERS**: Style navigation is checked against live worker state. The replay
/// must get the stage offset the worker reported, and the resolved source must match both
/// value and offset.
///
/// **BUG THIS CATCHES**: Would catch the calibration record being skipped, the replay
/// getting a default offset, or an elapsed time being recorded for an interactive test.
#[tokio::test]
async fn given_matching_style_source_when_interactive_document_run_then_passes() {
    // GIVEN: pass, calibration at (10, 20) with ready=true, one style source request
    let (mut client, _worker, module) = registered_client().await;
    let responses = [
        encode_pass(),
        encode_calibration(StageOffset { x: 10, y: 20 }, true),
        encode_style_source_request(&style_request(module)).unwrap(),
    ]
    .concat();
    let mut reader = ResponseReader::new(&responses[..]);
    let replay = Arc::new(RecordingReplay::default());
    let tester = interactive(
        replay.clone(),
        StyleSource {
            value: EXPECTED_SKIN.to_string(),
            text_offset: EXPECTED_OFFSET,
        },
    );
    let document = DocumentUnit::new("Form.mxml", "fixtures", b"<Form/>".to_vec());

    // WHEN: Running the interactive test
    let outcome = run_document(&mut client, &mut reader, module, &document, &tester)
        .await
        .unwrap();

    // THEN: Passed without elapsed time, and the replay saw the reported offset
    assert_eq!(outcome, TestOutcome::Passed { elapsed: None });
    let steps = replay.steps.lock().unwrap();
    assert_eq!(
        *steps,
        vec![(
            PathBuf::from("roboflest/styleNavigation.txt"),
            0,
            StageOffset { x: 10, y: 20 }
        )]
    );
}

/// **VALUE**: Verifies a resolved source at the wrong offset fails the test.
///
/// **WHY THIS MATTERS**: Navigation to the right value but the wrong place in the file is
/// still a broken feature.
///
/// **BUG THIS CATCHES**: Would catch a comparison that only checks the value.
#[tokio::test]
async fn given_wrong_offset_when_interactive_document_run_then_fails() {
    // GIVEN: A resolver that finds the right skin at the wrong offset
    let (mut client, _worker, module) = registered_client().await;
    let responses = [
        encode_pass(),
        encode_calibration(StageOffset::default(), true),
        encode_style_source_request(&style_request(module)).unwrap(),
    ]
    .concat();
    let mut reader = ResponseReader::new(&responses[..]);
    let tester = interactive(
        Arc::new(RecordingReplay::default()),
        StyleSource {
            value: EXPECTED_SKIN.to_string(),
            text_offset: 17,
        },
    );
    let document = DocumentUnit::new("Form.mxml", "fixtures", b"<Form/>".to_vec());

    // WHEN: Running the interactive test
    let outcome = run_document(&mut client, &mut reader, module, &document, &tester)
        .await
        .unwrap();

    // THEN: Failed, naming both offsets
    let reason = match outcome {
        TestOutcome::Failed { reason } => reason,
        other => panic!("Expected a failure, got {other:?}"),
    };
    assert!(reason.starts_with("Form\n"), "Reason was {reason:?}");
    assert!(reason.contains("2186") && reason.contains("17"));
}

#[tokio::test]
async fn given_stage_not_ready_when_interactive_document_run_then_fails_without_replay() {
    // GIVEN: pass, then calibration with ready=false
    let (mut client, _worker, module) = registered_client().await;
    let responses = [
        encode_pass(),
        encode_calibration(StageOffset::default(), false),
    ]
    .concat();
    let mut reader = ResponseReader::new(&responses[..]);
    let replay = Arc::new(RecordingReplay::default());
    let tester = interactive(
        replay.clone(),
        StyleSource {
            value: EXPECTED_SKIN.to_string(),
            text_offset: EXPECTED_OFFSET,
        },
    );
    let document = DocumentUnit::new("Form.mxml", "fixtures", b"<Form/>".to_vec());

    // WHEN: Running the interactive test
    let outcome = run_document(&mut client, &mut reader, module, &document, &tester)
        .await
        .unwrap();

    // THEN: Failed and nothing was replayed
    assert!(!outcome.is_passed());
    assert!(replay.steps.lock().unwrap().is_empty());
}

#[test]
fn given_last_only_when_selecting_then_includes_only_final_document() {
    // GIVEN: Three documents
    let total = 3;

    // WHEN: Asking each selection about each index
    let last_only: Vec<bool> = (0..total)
        .map(|i| BatchSelection::LastOnly.includes(i, total))
        .collect();
    let all: Vec<bool> = (0..total)
        .map(|i| BatchSelection::All.includes(i, total))
        .collect();

    // THEN: LastOnly picks the final one, All picks every one
    assert_eq!(last_only, vec![false, false, true]);
    assert_eq!(all, vec![true, true, true]);
    assert!(!BatchSelection::LastOnly.includes(0, 0));
}

#[test]
fn given_default_filter_when_checking_names_then_only_mxml_is_artifact() {
    // GIVEN: The default artifact filter
    let filter = ArtifactFilter::default();

    // WHEN / THEN: Only .mxml files are test artifacts
    let artifact = |name: &str| filter.is_artifact(&DocumentUnit::new(name, "fixtures", Vec::new()));
    assert!(artifact("Form.mxml"));
    assert!(!artifact("styles.css"));
    assert!(!artifact("Form.mxml.bak"));
}
