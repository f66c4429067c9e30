// Unit tests for registration ordering in the command writer
// End-to-end registration over a real socket is in integration_tests/session.rs

use crate::channel::TestClient;
use crate::codec::TestTarget;
use crate::codec::worker::{ClientMessage, WorkerStringTable, read_client_message};
use crate::error::{HarnessError, RegistrationError};

use models::{
    DocumentUnit, LibraryDescriptor, LibrarySet, LibrarySetBuilder, LibrarySetId,
    ModuleDescriptor, ModuleId, ProjectDescriptor,
};

fn project() -> ProjectDescriptor {
    ProjectDescriptor::new("demo", "demo1a2b3c4d")
}

fn library_set(project: &ProjectDescriptor) -> LibrarySet {
    LibrarySetBuilder::default()
        .with_id(LibrarySetId::for_project(project))
        .with_library(LibraryDescriptor::new("A", "/libs/A.swc", 0, false))
        .with_library(LibraryDescriptor::new("B", "/libs/B.swc", 1, true))
        .build()
        .unwrap()
}

async fn decode_all(bytes: &[u8]) -> Vec<ClientMessage> {
    let mut input = bytes;
    let mut table = WorkerStringTable::default();
    let mut messages = Vec::new();
    while let Some(message) = read_client_message(&mut input, &mut table).await.unwrap() {
        messages.push(message);
    }
    messages
}

/// **VALUE**: Verifies a module referencing an unregistered library set is refused before
/// anything is written.
///
/// **WHY THIS MATTERS**: The worker resolves module dependencies by set id at registration
/// time. A module that arrives first would be bound to nothing.
///
/// **BUG THIS CATCHES**: Would catch the order check running after the frame was written,
/// or not running at all.
#[tokio::test]
async fn given_no_library_set_when_module_registered_then_order_error_and_nothing_written() {
    // GIVEN: An open project and no library set
    let project = project();
    let mut client = TestClient::new(Vec::new());
    client.open_project(&project).await.unwrap();
    let mut reference = TestClient::new(Vec::new());
    reference.open_project(&project).await.unwrap();

    // WHEN: Registering a module against the project's set id
    let result = client
        .register_module(
            &ModuleDescriptor::new("app"),
            &[LibrarySetId::for_project(&project)],
        )
        .await;

    // THEN: Order error, and the output is exactly the open project frame
    assert!(matches!(
        result,
        Err(HarnessError::Registration(RegistrationError::Order { .. }))
    ));
    assert_eq!(client.into_inner(), reference.into_inner());
}

#[tokio::test]
async fn given_no_project_when_library_set_registered_then_order_error() {
    // GIVEN: A client with nothing sent
    let project = project();
    let mut client = TestClient::new(Vec::new());

    // WHEN: Registering the library set first
    let result = client.register_library_set(&library_set(&project)).await;

    // THEN: Order error and an empty stream
    assert!(matches!(
        result,
        Err(HarnessError::Registration(RegistrationError::Order { .. }))
    ));
    assert!(client.into_inner().is_empty());
}

/// **VALUE**: Verifies a session accepts exactly one library set.
///
/// **WHY THIS MATTERS**: Modules are registered against the session's set; a second set
/// would leave it undefined which one a module's libraries come from.
///
/// **BUG THIS CATCHES**: Would catch the registered set being overwritten silently.
#[tokio::test]
async fn given_registered_library_set_when_second_registered_then_order_error() {
    // GIVEN: Project and library set registered
    let project = project();
    let set = library_set(&project);
    let mut client = TestClient::new(Vec::new());
    client.open_project(&project).await.unwrap();
    client.register_library_set(&set).await.unwrap();

    // WHEN: Registering another set
    let result = client.register_library_set(&set).await;

    // THEN: Order error
    assert!(matches!(
        result,
        Err(HarnessError::Registration(RegistrationError::Order { .. }))
    ));
}

#[tokio::test]
async fn given_unregistered_module_when_document_opened_then_unknown_module_error() {
    // GIVEN: A client with a project but no modules
    let mut client = TestClient::new(Vec::new());
    client.open_project(&project()).await.unwrap();
    let document = DocumentUnit::new("Form.mxml", "fixtures", b"<Form/>".to_vec());

    // WHEN: Opening a document for module 3
    let result = client.open_document(ModuleId::new(3), &document).await;

    // THEN: Unknown module
    assert!(matches!(
        result,
        Err(HarnessError::Registration(RegistrationError::UnknownModule { .. }))
    ));
}

/// **VALUE**: Verifies the full registration sequence decodes back to the same state, with
/// sequential module ids.
///
/// **WHY THIS MATTERS**: This is the contract with the worker: order, field layout and
/// string references must all agree for the worker to rebuild the project.
///
/// **BUG THIS CATCHES**: Would catch field order drift between encoder and decoder, module
/// ids not starting at 0, or a repeated string being flushed twice (the worker table
/// rejects a duplicate id sequence).
#[tokio::test]
async fn given_full_registration_when_decoded_then_matches_sent_state() {
    // GIVEN: Project, library set and two modules
    let project = project();
    let set = library_set(&project);
    let mut client = TestClient::new(Vec::new());

    // WHEN: Registering everything and testing one document
    client.open_project(&project).await.unwrap();
    client.register_library_set(&set).await.unwrap();
    let first = client
        .register_module(&ModuleDescriptor::new("app"), &[set.id().clone()])
        .await
        .unwrap();
    let second = client
        .register_module(&ModuleDescriptor::new("lib"), &[set.id().clone()])
        .await
        .unwrap();
    let document = DocumentUnit::new("Form.mxml", "fixtures", b"<Form/>".to_vec());
    client.open_document(first, &document).await.unwrap();
    client
        .test("Form", &TestTarget::Group("fixtures".to_string()))
        .await
        .unwrap();
    let messages = decode_all(&client.into_inner()).await;

    // THEN: Module ids are sequential and every message decodes to what was sent
    assert_eq!(first.value(), 0);
    assert_eq!(second.value(), 1);
    assert_eq!(
        messages,
        vec![
            ClientMessage::OpenProject {
                name: "demo".to_string(),
                location_hash: "demo1a2b3c4d".to_string(),
            },
            ClientMessage::RegisterLibrarySet {
                id: "demo1a2b3c4d".to_string(),
                policy: set.policy(),
                libraries: set.libraries().to_vec(),
            },
            ClientMessage::RegisterModule {
                module_id: 0,
                name: "app".to_string(),
                library_set_ids: vec!["demo1a2b3c4d".to_string()],
                local_style_holders: Vec::new(),
            },
            ClientMessage::RegisterModule {
                module_id: 1,
                name: "lib".to_string(),
                library_set_ids: vec!["demo1a2b3c4d".to_string()],
                local_style_holders: Vec::new(),
            },
            ClientMessage::OpenDocument {
                module_id: 0,
                file_name: "Form.mxml".to_string(),
                content: b"<Form/>".to_vec(),
            },
            ClientMessage::Test {
                document: "Form".to_string(),
                target: TestTarget::Group("fixtures".to_string()),
            },
        ]
    );
}

#[tokio::test]
async fn given_no_open_project_when_close_project_called_then_order_error() {
    // GIVEN: A fresh client
    let mut client = TestClient::new(Vec::new());

    // WHEN: Closing a project that was never opened
    let result = client.close_project().await;

    // THEN: Order error
    assert!(matches!(
        result,
        Err(HarnessError::Registration(RegistrationError::Order { .. }))
    ));
}
