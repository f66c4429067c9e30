use crate::helpers::{LOCATION_HASH, PROJECT_NAME, document, project, setup};

use harness_core::TestClient;
use harness_core::codec::worker::{
    ClientMessage, WorkerStringTable, read_client_frame, read_client_message,
};
use harness_core::codec::{ClientMethod, TestTarget};

use models::{LibrarySetId, ModuleDescriptor};

use tokio::io::{BufReader, duplex};

// ============================================================================
// Public API tests for the channel codec, client side against worker side
// ============================================================================

/// **VALUE**: Verifies string ids are shared across frames for the life of the channel.
///
/// **WHY THIS MATTERS**: The worker keeps one table per connection. Each string is sent
/// once; every later frame refers to it by id. Sending it again, or with a new id, shifts
/// every id after it on the worker side.
///
/// **BUG THIS CATCHES**: Would catch a per-frame table, an id counter reset between frames,
/// or a string resent after it was committed.
#[tokio::test]
async fn given_repeated_strings_across_frames_when_sent_then_each_is_flushed_once() {
    // GIVEN: A client writing into an in-memory pipe
    let (write_half, read_half) = duplex(64 * 1024);
    let mut client = TestClient::new(write_half);
    let mut reader = BufReader::new(read_half);

    // WHEN: Opening the project (name, hash), then closing it (hash again)
    client.open_project(&project()).await.unwrap();
    client.close_project().await.unwrap();

    // THEN: The first frame defines ids 0 and 1; the second only references id 1
    let open = read_client_frame(&mut reader).await.unwrap().unwrap();
    assert_eq!(open.method, ClientMethod::OpenProject);
    assert_eq!(
        open.strings,
        vec![
            (0, PROJECT_NAME.to_string()),
            (1, LOCATION_HASH.to_string())
        ]
    );

    let close = read_client_frame(&mut reader).await.unwrap().unwrap();
    assert_eq!(close.method, ClientMethod::CloseProject);
    assert!(close.strings.is_empty());
    assert_eq!(close.body, 1u32.to_be_bytes().to_vec());
}

/// **VALUE**: A whole session's worth of commands decodes on the worker side in order.
///
/// **WHY THIS MATTERS**: The protocol is positional with no self-description; this is the
/// only check that both halves agree on every field of every command.
///
/// **BUG THIS CATCHES**: Would catch a field written in a different order or width than the
/// worker reads it.
#[tokio::test]
async fn given_registration_and_two_tests_when_decoded_then_worker_sees_same_commands() {
    // GIVEN: A registered project, library set and module
    let (write_half, read_half) = duplex(64 * 1024);
    let mut client = TestClient::new(write_half);
    let setup = setup();
    client.open_project(setup.project()).await.unwrap();
    client
        .register_library_set(setup.library_set())
        .await
        .unwrap();
    let module = client
        .register_module(
            &ModuleDescriptor::new("app"),
            &[LibrarySetId::for_project(setup.project())],
        )
        .await
        .unwrap();

    // WHEN: Opening and testing two documents, one by group and one by variant
    let form = document("Form.mxml");
    client.open_document(module, &form).await.unwrap();
    client
        .test("Form", &TestTarget::Group("fixtures".to_string()))
        .await
        .unwrap();
    client.open_document(module, &form).await.unwrap();
    client.test("Form", &TestTarget::Variant(5)).await.unwrap();
    client.shutdown().await.unwrap();

    // THEN: The worker decodes all seven commands, then a clean end of stream
    let mut reader = BufReader::new(read_half);
    let mut table = WorkerStringTable::default();
    let mut received = Vec::new();
    while let Some(message) = read_client_message(&mut reader, &mut table).await.unwrap() {
        received.push(message);
    }

    assert_eq!(received.len(), 7);
    assert_eq!(
        received[4],
        ClientMessage::Test {
            document: "Form".to_string(),
            target: TestTarget::Group("fixtures".to_string()),
        }
    );
    assert_eq!(received[3], received[5]);
    assert_eq!(
        received[6],
        ClientMessage::Test {
            document: "Form".to_string(),
            target: TestTarget::Variant(5),
        }
    );
    match &received[3] {
        ClientMessage::OpenDocument {
            module_id, content, ..
        } => {
            assert_eq!(*module_id, module.value());
            assert_eq!(content, form.content());
        }
        other => panic!("Expected OpenDocument, got {other:?}"),
    }
}
