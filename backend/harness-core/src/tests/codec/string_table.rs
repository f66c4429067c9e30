// Unit tests for the session string table
// Cross-message id sequences are covered in integration_tests/codec.rs

use crate::codec::StringRegistry;

/// **VALUE**: Verifies ids are handed out in first-seen order and a repeated value reuses its id.
///
/// **WHY THIS MATTERS**: The worker resolves every reference by id. A value flushed twice
/// or under two ids would make the worker's table diverge from ours.
///
/// **BUG THIS CATCHES**: Would catch interning that assigns a new id on every call, or that
/// records a repeated value in the change's flush list.
#[test]
fn given_repeated_value_when_interned_then_reuses_id_and_flushes_once() {
    // GIVEN: A fresh registry and one change
    let mut registry = StringRegistry::new();
    let mut table = registry.start_change();

    // WHEN: Interning a value twice around another value
    let first = table.intern("A.swc");
    let second = table.intern("B.swc");
    let again = table.intern("A.swc");

    // THEN: Ids follow first-seen order and the repeat is not flushed again
    assert_eq!(first.value(), 0);
    assert_eq!(second.value(), 1);
    assert_eq!(again, first);
    assert_eq!(table.added().len(), 2);
    table.commit();
    assert_eq!(registry.len(), 2);
}

/// **VALUE**: Verifies a change dropped without commit gives its ids back.
///
/// **WHY THIS MATTERS**: A change is dropped when its message failed to encode or send.
/// The worker never saw those strings, so the next message must reuse the same ids.
///
/// **BUG THIS CATCHES**: Would catch a gap in the id sequence after a failed send, which
/// the worker rejects as out-of-sequence.
#[test]
fn given_uncommitted_change_when_dropped_then_ids_are_reused() {
    // GIVEN: One committed change holding "project"
    let mut registry = StringRegistry::new();
    let mut table = registry.start_change();
    table.intern("project");
    table.commit();

    // WHEN: A second change interns a value and is dropped
    {
        let mut failed = registry.start_change();
        failed.intern("lost");
    }

    // THEN: The next change continues right after the committed id
    let mut table = registry.start_change();
    let id = table.intern("kept");
    assert_eq!(id.value(), 1);
    table.commit();
    assert!(registry.lookup("lost").is_none());
    assert_eq!(registry.lookup("kept").map(|id| id.value()), Some(1));
}

/// **VALUE**: Verifies a change with no new strings still writes its count.
///
/// **WHY THIS MATTERS**: Every frame carries the count field. A message that only reuses
/// known strings must write `0`, otherwise the worker reads the payload as the count.
///
/// **BUG THIS CATCHES**: Would catch an optimization that skips the flush entirely when
/// nothing is new.
#[test]
fn given_no_new_strings_when_encoded_then_writes_zero_count() {
    // GIVEN: A registry that already knows "Form"
    let mut registry = StringRegistry::new();
    let mut table = registry.start_change();
    table.intern("Form");
    table.commit();

    // WHEN: A new change only references the known value
    let mut table = registry.start_change();
    table.intern("Form");
    let mut buf = Vec::new();
    table.encode_into(&mut buf).unwrap();

    // THEN: Exactly a zero count is written
    assert_eq!(buf, vec![0, 0, 0, 0]);
}

#[test]
fn given_new_strings_when_encoded_then_writes_id_length_and_bytes() {
    // GIVEN: A change with one new value
    let mut registry = StringRegistry::new();
    let mut table = registry.start_change();
    table.intern("ab");

    // WHEN: Encoding the flush
    let mut buf = Vec::new();
    table.encode_into(&mut buf).unwrap();

    // THEN: count, id, byte length, bytes
    assert_eq!(buf, vec![0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 2, b'a', b'b']);
}
