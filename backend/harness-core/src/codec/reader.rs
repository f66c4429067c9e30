use crate::codec::method::ServerMethod;
use crate::error::ProtocolError;

use models::{ModuleId, StageOffset, TestOutcome};

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Body of a `ResolveExternalInlineStyleDeclarationSource` request: which
/// inline style attribute the user clicked in the rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSourceRequest {
    pub module: ModuleId,
    pub document: String,
    pub element_type: String,
    pub property: String,
    /// Attribute value as rendered by the worker.
    pub value: String,
}

/// Reads worker records off the inbound half of the channel.
///
/// No method here applies a timeout; the caller bounds the whole exchange.
#[derive(Debug)]
pub struct ResponseReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> ResponseReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub async fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.inner.read_u8().await?)
    }

    pub async fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.inner.read_u8().await? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::desync(format!(
                "Expected boolean byte, got {other:#04x}"
            ))),
        }
    }

    pub async fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(self.inner.read_i32().await?)
    }

    pub async fn read_utf(&mut self) -> Result<String, ProtocolError> {
        let length = self.inner.read_u16().await?;
        let mut bytes = vec![0; usize::from(length)];
        self.inner.read_exact(&mut bytes).await?;
        String::from_utf8(bytes)
            .map_err(|e| ProtocolError::desync(format!("Invalid UTF-8 in string record: {e}")))
    }

    /// `bool passed`, then on failure the worker's message.
    ///
    /// `elapsed` is attached to a pass as-is.
    pub async fn read_outcome(
        &mut self,
        document: &str,
        elapsed: Option<Duration>,
    ) -> Result<TestOutcome, ProtocolError> {
        if self.read_bool().await? {
            Ok(TestOutcome::Passed { elapsed })
        } else {
            let message = self.read_utf().await?;
            Ok(TestOutcome::failed(document, &message))
        }
    }

    pub async fn read_stage_offset(&mut self) -> Result<StageOffset, ProtocolError> {
        let x = self.read_i32().await?;
        let y = self.read_i32().await?;
        Ok(StageOffset { x, y })
    }

    pub async fn read_server_method(&mut self) -> Result<ServerMethod, ProtocolError> {
        let code = self.read_u8().await?;
        ServerMethod::from_code(code)
            .ok_or_else(|| ProtocolError::desync(format!("Unknown server method {code}")))
    }

    /// Module id and body of a style source request; the method byte has
    /// already been consumed.
    pub async fn read_style_source_request(&mut self) -> Result<StyleSourceRequest, ProtocolError> {
        let module = ModuleId::new(self.read_i32().await?);
        let document = self.read_utf().await?;
        let element_type = self.read_utf().await?;
        let property = self.read_utf().await?;
        let value = self.read_utf().await?;

        Ok(StyleSourceRequest {
            module,
            document,
            element_type,
            property,
            value,
        })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
