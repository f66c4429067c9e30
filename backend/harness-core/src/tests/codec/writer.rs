use crate::codec::worker::encode_failure;
use crate::codec::{ClientMethod, MessageBody, StringRegistry, encode_frame};
use crate::error::ProtocolError;

/// **VALUE**: Verifies the frame length prefix counts every byte after itself.
///
/// **WHY THIS MATTERS**: The worker reads exactly `length` bytes per frame. An off-by-four
/// prefix (counting itself, or leaving out the method byte) desyncs every later frame.
///
/// **BUG THIS CATCHES**: Would catch a length computed before the payload was appended, or
/// one that includes the prefix.
#[test]
fn given_open_project_when_frame_encoded_then_length_prefix_matches_rest() {
    // GIVEN: An open project payload with two new strings
    let mut registry = StringRegistry::new();
    let mut table = registry.start_change();
    let mut body = MessageBody::new();
    body.write_ref(table.intern("demo"))
        .write_ref(table.intern("demo1a2b3c4d"));

    // WHEN: Encoding the frame
    let frame = encode_frame(ClientMethod::OpenProject, &table, &body).unwrap();

    // THEN: The prefix equals the remaining length and the method byte follows it
    let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    assert_eq!(length, frame.len() - 4);
    assert_eq!(frame[4], ClientMethod::OpenProject.code());
    assert_eq!(&frame[5..9], &2u32.to_be_bytes());
    assert_eq!(&frame[frame.len() - 8..], body.as_bytes());
}

#[test]
fn given_document_content_when_written_then_is_length_prefixed() {
    // GIVEN: A body
    let mut body = MessageBody::new();

    // WHEN: Writing bytes
    body.write_bytes(b"<s:Button/>").unwrap();

    // THEN: u32 length then the bytes
    assert_eq!(&body.as_bytes()[..4], &11u32.to_be_bytes());
    assert_eq!(&body.as_bytes()[4..], b"<s:Button/>");
}

/// **VALUE**: Verifies record strings longer than a `u16` length are rejected.
///
/// **WHY THIS MATTERS**: Truncating the length silently would produce a record whose tail
/// is read as the next field.
///
/// **BUG THIS CATCHES**: Would catch an `as u16` cast replacing the checked conversion in `put_utf`.
#[test]
fn given_oversized_message_when_failure_encoded_then_returns_encode_error() {
    // GIVEN: A message one byte over the limit
    let message = "x".repeat(usize::from(u16::MAX) + 1);

    // WHEN: Encoding it as a failure record
    let result = encode_failure(&message);

    // THEN: Encode error
    assert!(matches!(result, Err(ProtocolError::Encode { .. })));
}
