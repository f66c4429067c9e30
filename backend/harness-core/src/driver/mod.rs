//! Per-document test exchange.
//!
//! A document is opened, tested and its outcome read back. A failing
//! document is an outcome, not an error; errors here mean the channel can
//! no longer be trusted.

mod interactive;

pub use interactive::{
    InteractionReplay, InteractiveTest, ReplayError, StyleSource, StyleSourceAssertion,
    StyleSourceResolver,
};

use crate::channel::TestClient;
use crate::codec::{ResponseReader, TestTarget};
use crate::error::HarnessError;

use models::{DocumentUnit, ModuleId, TestOutcome};

use std::sync::OnceLock;
use std::time::Instant;

use log::{debug, info};
use regex::Regex;
use tokio::io::{AsyncRead, AsyncWrite};

pub const DEFAULT_ARTIFACT_PATTERN: &str = r"\.mxml$";

static DEFAULT_ARTIFACT_REGEX: OnceLock<Regex> = OnceLock::new();

/// How one document is tested.
#[derive(Clone)]
pub enum Tester {
    /// Open, test against the document's group, read the outcome.
    Standard,
    /// Test a numbered variant, then replay interactions and check the
    /// worker's follow-up requests.
    Interactive(InteractiveTest),
}

/// Which documents of a batch are test targets. The rest are fixtures the
/// targets depend on and only need to exist in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchSelection {
    #[default]
    All,
    LastOnly,
}

impl BatchSelection {
    pub fn includes(self, index: usize, total: usize) -> bool {
        match self {
            BatchSelection::All => index < total,
            BatchSelection::LastOnly => total > 0 && index == total - 1,
        }
    }
}

/// Decides from the file name whether a document is a test artifact.
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    pattern: Regex,
}

impl ArtifactFilter {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn is_artifact(&self, document: &DocumentUnit) -> bool {
        self.pattern.is_match(document.file_name())
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for ArtifactFilter {
    fn default() -> Self {
        let pattern = DEFAULT_ARTIFACT_REGEX
            .get_or_init(|| Regex::new(DEFAULT_ARTIFACT_PATTERN).expect("valid regex pattern"));
        Self::new(pattern.clone())
    }
}

/// Run one document with `tester` and read its outcome.
pub async fn run_document<W, R>(
    client: &mut TestClient<W>,
    reader: &mut ResponseReader<R>,
    module: ModuleId,
    document: &DocumentUnit,
    tester: &Tester,
) -> Result<TestOutcome, HarnessError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    match tester {
        Tester::Standard => run_standard(client, reader, module, document).await,
        Tester::Interactive(test) => test.run(client, reader, module, document).await,
    }
}

async fn run_standard<W, R>(
    client: &mut TestClient<W>,
    reader: &mut ResponseReader<R>,
    module: ModuleId,
    document: &DocumentUnit,
) -> Result<TestOutcome, HarnessError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let name = document.name();

    let started = Instant::now();
    client.open_document(module, document).await?;
    let elapsed = started.elapsed();
    debug!("Opened {} in {elapsed:?}", document.file_name());

    client
        .test(name, &TestTarget::Group(document.group().to_string()))
        .await?;

    let outcome = reader.read_outcome(name, Some(elapsed)).await?;
    match &outcome {
        TestOutcome::Passed { .. } => info!("{name} passed ({} ms)", elapsed.as_millis()),
        TestOutcome::Failed { reason } => info!("{name} failed: {reason}"),
    }
    Ok(outcome)
}
