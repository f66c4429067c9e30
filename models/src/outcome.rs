//! Results reported by the worker and aggregated per session.

use std::time::Duration;

/// Result of one document test as read off the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// `elapsed` is the time taken to open the document, when measured.
    Passed { elapsed: Option<Duration> },
    /// `reason` is `"<document-name>\n<worker message>"`.
    Failed { reason: String },
}

impl TestOutcome {
    pub fn failed(document: &str, message: &str) -> Self {
        TestOutcome::Failed {
            reason: format!("{document}\n{message}"),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed { .. })
    }
}

/// Position of the worker stage on screen, used to calibrate replayed
/// mouse interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageOffset {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitResult {
    Completed(TestOutcome),
    /// The file is not a test artifact, or was not selected in the batch.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub document: String,
    pub result: UnitResult,
}

/// Aggregated results of the documents a session ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    reports: Vec<UnitReport>,
}

impl SessionReport {
    pub fn record(&mut self, report: UnitReport) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[UnitReport] {
        &self.reports
    }

    pub fn passed(&self) -> usize {
        self.count(|result| matches!(result, UnitResult::Completed(TestOutcome::Passed { .. })))
    }

    pub fn failed(&self) -> usize {
        self.count(|result| matches!(result, UnitResult::Completed(TestOutcome::Failed { .. })))
    }

    pub fn skipped(&self) -> usize {
        self.count(|result| matches!(result, UnitResult::Skipped))
    }

    /// Failure reasons in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &str> {
        self.reports.iter().filter_map(|report| match &report.result {
            UnitResult::Completed(TestOutcome::Failed { reason }) => Some(reason.as_str()),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn merge(&mut self, other: SessionReport) {
        self.reports.extend(other.reports);
    }

    fn count(&self, predicate: impl Fn(&UnitResult) -> bool) -> usize {
        self.reports
            .iter()
            .filter(|report| predicate(&report.result))
            .count()
    }
}
