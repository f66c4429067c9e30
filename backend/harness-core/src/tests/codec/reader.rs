use crate::codec::ResponseReader;
use crate::error::ProtocolError;

use models::TestOutcome;

use std::time::Duration;

/// **VALUE**: Verifies a boolean byte other than 0 or 1 is a desync.
///
/// **WHY THIS MATTERS**: There is no framing on responses. A stray byte where a flag is
/// expected means the stream position is already wrong.
///
/// **BUG THIS CATCHES**: Would catch a `byte != 0` shortcut that reads garbage as `true`.
#[tokio::test]
async fn given_invalid_boolean_byte_when_read_bool_called_then_returns_desync() {
    // GIVEN: A stream holding 0x02
    let mut reader = ResponseReader::new(&[2u8][..]);

    // WHEN: Reading a flag
    let result = reader.read_bool().await;

    // THEN: Desync
    assert!(matches!(result, Err(ProtocolError::Desync { .. })));
}

/// **VALUE**: Verifies a failed result becomes `"<document>\n<message>"`.
///
/// **WHY THIS MATTERS**: The reason is what the person reading the report sees; it must
/// name the document first.
///
/// **BUG THIS CATCHES**: Would catch a reason missing the document name or the separator.
#[tokio::test]
async fn given_failed_result_when_read_outcome_called_then_reason_names_document() {
    // GIVEN: passed=false followed by "style mismatch"
    let mut bytes = vec![0, 0, 14];
    bytes.extend_from_slice(b"style mismatch");
    let mut reader = ResponseReader::new(&bytes[..]);

    // WHEN: Reading the outcome
    let outcome = reader
        .read_outcome("Button", Some(Duration::from_millis(3)))
        .await
        .unwrap();

    // THEN: The reason joins name and message with a newline
    assert_eq!(
        outcome,
        TestOutcome::Failed {
            reason: "Button\nstyle mismatch".to_string()
        }
    );
}

#[tokio::test]
async fn given_passed_result_when_read_outcome_called_then_keeps_elapsed() {
    // GIVEN: passed=true
    let mut reader = ResponseReader::new(&[1u8][..]);

    // WHEN: Reading the outcome with a measured open time
    let outcome = reader
        .read_outcome("Form", Some(Duration::from_millis(12)))
        .await
        .unwrap();

    // THEN: Passed with that elapsed time
    assert_eq!(
        outcome,
        TestOutcome::Passed {
            elapsed: Some(Duration::from_millis(12))
        }
    );
}

/// **VALUE**: Verifies a record cut short by the worker closing is reported as closed.
///
/// **WHY THIS MATTERS**: A worker crash mid-record should read as a closed channel, not as
/// a generic I/O failure, so the report points at the worker.
///
/// **BUG THIS CATCHES**: Would catch `UnexpectedEof` being mapped to `Io`.
#[tokio::test]
async fn given_truncated_string_when_read_utf_called_then_returns_closed() {
    // GIVEN: A length of 10 followed by only 3 bytes
    let bytes = [0u8, 10, b'a', b'b', b'c'];
    let mut reader = ResponseReader::new(&bytes[..]);

    // WHEN: Reading the string
    let result = reader.read_utf().await;

    // THEN: Closed
    assert!(matches!(result, Err(ProtocolError::Closed { .. })));
}

#[tokio::test]
async fn given_unknown_server_method_when_read_then_returns_desync() {
    // GIVEN: Method code 9
    let mut reader = ResponseReader::new(&[9u8][..]);

    // WHEN: Reading a server method
    let result = reader.read_server_method().await;

    // THEN: Desync
    assert!(matches!(result, Err(ProtocolError::Desync { .. })));
}
