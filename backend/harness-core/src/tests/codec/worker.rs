// Unit tests for the worker-side decoder

use crate::codec::worker::{ClientFrame, ClientMessage, WorkerStringTable, read_client_frame};
use crate::codec::{ClientMethod, MessageBody, StringRegistry, encode_frame};
use crate::error::ProtocolError;

/// **VALUE**: Verifies the worker rejects a flush whose ids skip a number.
///
/// **WHY THIS MATTERS**: The harness promises gap-free ids. The simulated worker is what
/// checks that promise in every session test, so it must actually enforce it.
///
/// **BUG THIS CATCHES**: Would catch a worker table that accepts any id and so hides
/// id-sequence bugs on the harness side.
#[test]
fn given_id_gap_when_flush_applied_then_returns_desync() {
    // GIVEN: A worker table that knows id 0
    let mut table = WorkerStringTable::default();
    table.apply(&[(0, "a".to_string())]).unwrap();

    // WHEN: Applying id 2 next
    let result = table.apply(&[(2, "c".to_string())]);

    // THEN: Desync
    assert!(matches!(result, Err(ProtocolError::Desync { .. })));
}

/// **VALUE**: Verifies bytes left over after a payload are rejected.
///
/// **WHY THIS MATTERS**: Field order is the only contract. Trailing bytes mean the harness
/// wrote a field the worker doesn't expect.
///
/// **BUG THIS CATCHES**: Would catch a decoder that silently ignores extra fields.
#[test]
fn given_trailing_bytes_when_decoded_then_returns_desync() {
    // GIVEN: A close project frame with an extra byte
    let frame = ClientFrame {
        method: ClientMethod::CloseProject,
        strings: vec![(0, "hash".to_string())],
        body: vec![0, 0, 0, 0, 0xff],
    };
    let mut table = WorkerStringTable::default();

    // WHEN: Decoding
    let result = ClientMessage::decode(&frame, &mut table);

    // THEN: Desync
    assert!(matches!(result, Err(ProtocolError::Desync { .. })));
}

#[test]
fn given_reference_to_unknown_string_when_decoded_then_returns_desync() {
    // GIVEN: A frame referencing id 5 with an empty table
    let frame = ClientFrame {
        method: ClientMethod::CloseProject,
        strings: Vec::new(),
        body: 5u32.to_be_bytes().to_vec(),
    };
    let mut table = WorkerStringTable::default();

    // WHEN: Decoding
    let result = ClientMessage::decode(&frame, &mut table);

    // THEN: Desync
    assert!(matches!(result, Err(ProtocolError::Desync { .. })));
}

#[tokio::test]
async fn given_encoded_frame_when_read_by_worker_then_splits_strings_and_body() {
    // GIVEN: An encoded close project frame
    let mut registry = StringRegistry::new();
    let mut table = registry.start_change();
    let mut body = MessageBody::new();
    body.write_ref(table.intern("hash"));
    let bytes = encode_frame(ClientMethod::CloseProject, &table, &body).unwrap();

    // WHEN: The worker reads it
    let mut input = &bytes[..];
    let frame = read_client_frame(&mut input).await.unwrap().unwrap();

    // THEN: Method, flush and payload come out separately, and the stream is at EOF
    assert_eq!(frame.method, ClientMethod::CloseProject);
    assert_eq!(frame.strings, vec![(0, "hash".to_string())]);
    assert_eq!(frame.body, vec![0, 0, 0, 0]);
    assert!(read_client_frame(&mut input).await.unwrap().is_none());
}
