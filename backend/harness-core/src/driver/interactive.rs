//! Tests that keep talking to the worker after the document passed.
//!
//! The worker reports where its stage sits on screen, then each replayed
//! interaction makes it send a request back, which is resolved on this side
//! and compared with what the test expects.

use crate::channel::TestClient;
use crate::codec::{ResponseReader, ServerMethod, StyleSourceRequest, TestTarget};
use crate::error::{HarnessError, ProtocolError};

use models::{DocumentUnit, ModuleDescriptor, ModuleId, StageOffset, TestOutcome};

use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

pub type ReplayError = Box<dyn StdError + Send + Sync>;

/// Replays recorded user interactions against the worker's stage.
pub trait InteractionReplay: Send + Sync {
    /// Perform the interactions leading up to assertion `step` of `script`.
    fn perform(&self, script: &Path, step: usize, offset: StageOffset) -> Result<(), ReplayError>;
}

/// Looks up where a style declaration comes from.
pub trait StyleSourceResolver: Send + Sync {
    fn resolve(
        &self,
        module: &ModuleDescriptor,
        request: &StyleSourceRequest,
    ) -> Option<StyleSource>;
}

/// A resolved declaration: its value and its offset in the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSource {
    pub value: String,
    pub text_offset: u32,
}

/// What one replayed interaction must resolve to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSourceAssertion {
    pub value: String,
    pub text_offset: u32,
}

impl StyleSourceAssertion {
    pub fn new(value: impl Into<String>, text_offset: u32) -> Self {
        Self {
            value: value.into(),
            text_offset,
        }
    }
}

#[derive(Clone)]
pub struct InteractiveTest {
    variant: i32,
    script: PathBuf,
    replay: Arc<dyn InteractionReplay>,
    resolver: Arc<dyn StyleSourceResolver>,
    assertions: Vec<StyleSourceAssertion>,
}

impl InteractiveTest {
    pub fn new(
        variant: i32,
        script: impl Into<PathBuf>,
        replay: Arc<dyn InteractionReplay>,
        resolver: Arc<dyn StyleSourceResolver>,
    ) -> Self {
        Self {
            variant,
            script: script.into(),
            replay,
            resolver,
            assertions: Vec::new(),
        }
    }

    pub fn with_assertion(mut self, assertion: StyleSourceAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    pub fn variant(&self) -> i32 {
        self.variant
    }

    pub fn assertions(&self) -> &[StyleSourceAssertion] {
        &self.assertions
    }

    /// Open the document, test its variant, then check every assertion.
    /// No elapsed time is recorded for interactive tests.
    pub(crate) async fn run<W, R>(
        &self,
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

        client.open_document(module, document).await?;
        client.test(name, &TestTarget::Variant(self.variant)).await?;

        let outcome = reader.read_outcome(name, None).await?;
        if !outcome.is_passed() {
            info!("{name} failed before interaction");
            return Ok(outcome);
        }

        let offset = reader.read_stage_offset().await?;
        if !reader.read_bool().await? {
            return Ok(TestOutcome::failed(name, "worker stage is not ready"));
        }
        debug!("{name}: stage at ({}, {})", offset.x, offset.y);

        for (step, assertion) in self.assertions.iter().enumerate() {
            if let Err(e) = self.replay.perform(&self.script, step, offset) {
                return Ok(TestOutcome::failed(
                    name,
                    &format!("replay of step {step} failed: {e}"),
                ));
            }

            let method = reader.read_server_method().await?;
            if method != ServerMethod::ResolveExternalInlineStyleDeclarationSource {
                return Err(ProtocolError::desync(format!(
                    "Expected a style source request at step {step}, got {method:?}"
                ))
                .into());
            }

            let request = reader.read_style_source_request().await?;
            if let Some(failure) = self.check(client, module, &request, assertion) {
                return Ok(TestOutcome::failed(name, &failure));
            }
        }

        info!("{name} passed ({} interactions)", self.assertions.len());
        Ok(TestOutcome::Passed { elapsed: None })
    }

    /// `None` when the request resolves to the expected declaration,
    /// otherwise the failure message.
    fn check<W>(
        &self,
        client: &TestClient<W>,
        module: ModuleId,
        request: &StyleSourceRequest,
        expected: &StyleSourceAssertion,
    ) -> Option<String> {
        if request.module != module {
            return Some(format!(
                "style source requested for module {}, expected {module}",
                request.module
            ));
        }

        let Some(descriptor) = client.module(module) else {
            return Some(format!("module {module} is not registered"));
        };

        let Some(source) = self.resolver.resolve(descriptor, request) else {
            return Some(format!(
                "no declaration found for {}.{} in {}",
                request.element_type, request.property, request.document
            ));
        };

        if source.value != expected.value || source.text_offset != expected.text_offset {
            return Some(format!(
                "expected {} at {}, resolved {} at {}",
                expected.value, expected.text_offset, source.value, source.text_offset
            ));
        }

        None
    }
}
