use harness_core::UnitExecutor;
use harness_core::error::SessionError;

use std::future::pending;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::time::sleep;

// ============================================================================
// Public API tests for bounded unit execution
// ============================================================================

#[tokio::test]
async fn given_fast_unit_when_run_then_returns_its_value() {
    // GIVEN: An executor with a generous deadline
    let executor = UnitExecutor::new(1, Duration::from_secs(2));

    // WHEN: Running a unit that finishes immediately
    let value = executor.run("Form", async { 42 }).await;

    // THEN: The value comes back
    assert_eq!(value.unwrap(), 42);
}

/// **VALUE**: Verifies a unit that never finishes is given up on at the deadline.
///
/// **WHY THIS MATTERS**: Each document gets 8 seconds. Waiting longer stalls the whole run;
/// giving up early fails documents that were only slow.
///
/// **BUG THIS CATCHES**: Would catch a missing timeout, or a timeout that fires far from
/// the configured deadline.
#[tokio::test]
async fn given_unit_that_never_finishes_when_run_then_times_out_near_deadline() {
    // GIVEN: A 300ms deadline
    let executor = UnitExecutor::new(1, Duration::from_millis(300));

    // WHEN: Running a unit that never finishes
    let started = Instant::now();
    let result = executor.run("Stuck", pending::<()>()).await;
    let waited = started.elapsed();

    // THEN: Timeout naming the document, close to the deadline
    match result {
        Err(SessionError::Timeout { document, .. }) => assert_eq!(document, "Stuck"),
        other => panic!("Expected a timeout, got {other:?}"),
    }
    assert!(waited >= Duration::from_millis(300));
    assert!(waited < Duration::from_secs(2));
}

/// **VALUE**: Verifies a timed-out unit is aborted rather than left running.
///
/// **WHY THIS MATTERS**: The unit owns the channel. If it kept running after the timeout it
/// could still write to the worker while the session tears down.
///
/// **BUG THIS CATCHES**: Would catch the executor only abandoning the join handle.
#[tokio::test]
async fn given_timed_out_unit_when_deadline_passes_then_unit_is_aborted() {
    // GIVEN: A unit that sets a flag after 500ms, and a 100ms deadline
    let executor = UnitExecutor::new(1, Duration::from_millis(100));
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();

    // WHEN: Running it and waiting past the point it would have finished
    let result = executor
        .run("Slow", async move {
            sleep(Duration::from_millis(500)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .await;
    sleep(Duration::from_millis(700)).await;

    // THEN: Timed out, and the flag was never set
    assert!(matches!(result, Err(SessionError::Timeout { .. })));
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn given_panicking_unit_when_run_then_reports_panic_message() {
    // GIVEN: A unit that panics
    let executor = UnitExecutor::default();

    // WHEN: Running it
    let result = executor
        .run::<(), _>("Broken", async { panic!("renderer exploded") })
        .await;

    // THEN: Panicked with the payload, not a crash of the caller
    match result {
        Err(SessionError::Panicked { message, .. }) => {
            assert!(message.contains("renderer exploded"), "{message}")
        }
        Err(other) => panic!("Expected a panic report, got {other:?}"),
        Ok(()) => panic!("Expected a panic report"),
    }
}

/// **VALUE**: Verifies the pool bound holds across concurrent callers.
///
/// **WHY THIS MATTERS**: The worker processes one document at a time. Two units in flight
/// would interleave their records on the channel.
///
/// **BUG THIS CATCHES**: Would catch the semaphore permit being released before the unit
/// finishes.
#[tokio::test]
async fn given_single_slot_when_two_units_run_concurrently_then_never_overlap() {
    // GIVEN: One slot and a counter of units in flight
    let executor = UnitExecutor::new(1, Duration::from_secs(2));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let unit = |in_flight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>| async move {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        in_flight.fetch_sub(1, Ordering::SeqCst);
    };

    // WHEN: Running two units at once
    let (first, second) = tokio::join!(
        executor.run("First", unit(in_flight.clone(), peak.clone())),
        executor.run("Second", unit(in_flight.clone(), peak.clone())),
    );

    // THEN: Both finished, never more than one at a time
    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn given_default_executor_then_deadline_is_eight_seconds() {
    assert_eq!(UnitExecutor::default().deadline(), Duration::from_secs(8));
}
