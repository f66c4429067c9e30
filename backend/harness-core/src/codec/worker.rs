//! The worker's half of the protocol.
//!
//! Decodes client frames the way the worker does and encodes the records
//! the worker sends back. Simulated workers are built on it, and it is the
//! reference the harness-side encoder is checked against.

use crate::codec::method::{ClientMethod, ServerMethod};
use crate::codec::reader::StyleSourceRequest;
use crate::codec::writer::put_utf;
use crate::codec::TestTarget;
use crate::error::ProtocolError;

use models::{DomainPolicy, LibraryDescriptor, LocalStyleHolder, StageOffset};

use tokio::io::{AsyncRead, AsyncReadExt};

/// A frame split into its method, string flush and undecoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFrame {
    pub method: ClientMethod,
    pub strings: Vec<(u32, String)>,
    pub body: Vec<u8>,
}

/// Read the next frame. `Ok(None)` when the harness closed the connection
/// on a frame boundary.
pub async fn read_client_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<Option<ClientFrame>, ProtocolError> {
    let mut length = [0u8; 4];
    let mut filled = 0;
    while filled < length.len() {
        let read = reader.read(&mut length[filled..]).await?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProtocolError::desync("Connection closed inside a frame header"));
        }
        filled += read;
    }

    let mut frame = vec![0u8; u32::from_be_bytes(length) as usize];
    reader.read_exact(&mut frame).await?;

    let mut cursor = FrameCursor::new(&frame);
    let code = cursor.read_u8()?;
    let method = ClientMethod::from_code(code)
        .ok_or_else(|| ProtocolError::desync(format!("Unknown client method {code}")))?;

    let count = cursor.read_u32()?;
    let mut strings = Vec::new();
    for _ in 0..count {
        let id = cursor.read_u32()?;
        let bytes = cursor.read_bytes()?;
        let value = String::from_utf8(bytes.to_vec())
            .map_err(|e| ProtocolError::desync(format!("Invalid UTF-8 for string {id}: {e}")))?;
        strings.push((id, value));
    }

    Ok(Some(ClientFrame {
        method,
        strings,
        body: cursor.remaining().to_vec(),
    }))
}

/// The worker's copy of the session string table.
#[derive(Debug, Default)]
pub struct WorkerStringTable {
    values: Vec<String>,
}

impl WorkerStringTable {
    /// Ids must continue the session sequence exactly.
    pub fn apply(&mut self, strings: &[(u32, String)]) -> Result<(), ProtocolError> {
        for (id, value) in strings {
            if *id as usize != self.values.len() {
                return Err(ProtocolError::desync(format!(
                    "String id {id} out of sequence, expected {}",
                    self.values.len()
                )));
            }
            self.values.push(value.clone());
        }
        Ok(())
    }

    pub fn resolve(&self, id: u32) -> Result<&str, ProtocolError> {
        self.values
            .get(id as usize)
            .map(String::as_str)
            .ok_or_else(|| ProtocolError::desync(format!("Reference to unknown string {id}")))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A decoded client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    OpenProject {
        name: String,
        location_hash: String,
    },
    RegisterLibrarySet {
        id: String,
        policy: DomainPolicy,
        libraries: Vec<LibraryDescriptor>,
    },
    RegisterModule {
        module_id: i32,
        name: String,
        library_set_ids: Vec<String>,
        local_style_holders: Vec<LocalStyleHolder>,
    },
    OpenDocument {
        module_id: i32,
        file_name: String,
        content: Vec<u8>,
    },
    Test {
        document: String,
        target: TestTarget,
    },
    CloseProject {
        location_hash: String,
    },
}

impl ClientMessage {
    /// Apply the frame's string flush, then decode its payload.
    pub fn decode(frame: &ClientFrame, table: &mut WorkerStringTable) -> Result<Self, ProtocolError> {
        table.apply(&frame.strings)?;
        let mut cursor = FrameCursor::new(&frame.body);

        let message = match frame.method {
            ClientMethod::OpenProject => ClientMessage::OpenProject {
                name: cursor.read_ref(table)?,
                location_hash: cursor.read_ref(table)?,
            },
            ClientMethod::RegisterLibrarySet => {
                let id = cursor.read_ref(table)?;
                let code = cursor.read_u8()?;
                let policy = DomainPolicy::from_wire(code)
                    .ok_or_else(|| ProtocolError::desync(format!("Unknown domain policy {code}")))?;
                let count = cursor.read_u32()?;
                let mut libraries = Vec::new();
                for _ in 0..count {
                    let name = cursor.read_ref(table)?;
                    let path = cursor.read_ref(table)?;
                    let position = cursor.read_u32()?;
                    let user_library = cursor.read_bool()?;
                    libraries.push(LibraryDescriptor::new(name, path, position, user_library));
                }
                ClientMessage::RegisterLibrarySet {
                    id,
                    policy,
                    libraries,
                }
            }
            ClientMethod::RegisterModule => {
                let module_id = cursor.read_i32()?;
                let name = cursor.read_ref(table)?;
                let set_count = cursor.read_u32()?;
                let mut library_set_ids = Vec::new();
                for _ in 0..set_count {
                    library_set_ids.push(cursor.read_ref(table)?);
                }
                let holder_count = cursor.read_u32()?;
                let mut local_style_holders = Vec::new();
                for _ in 0..holder_count {
                    let path = cursor.read_ref(table)?;
                    let style_count = cursor.read_u32()?;
                    let mut style_names = Vec::new();
                    for _ in 0..style_count {
                        style_names.push(cursor.read_ref(table)?);
                    }
                    local_style_holders.push(LocalStyleHolder { path, style_names });
                }
                ClientMessage::RegisterModule {
                    module_id,
                    name,
                    library_set_ids,
                    local_style_holders,
                }
            }
            ClientMethod::OpenDocument => ClientMessage::OpenDocument {
                module_id: cursor.read_i32()?,
                file_name: cursor.read_ref(table)?,
                content: cursor.read_bytes()?.to_vec(),
            },
            ClientMethod::Test => {
                let document = cursor.read_ref(table)?;
                let target = match cursor.read_u8()? {
                    TestTarget::GROUP_KIND => TestTarget::Group(cursor.read_ref(table)?),
                    TestTarget::VARIANT_KIND => TestTarget::Variant(cursor.read_i32()?),
                    other => {
                        return Err(ProtocolError::desync(format!("Unknown test target kind {other}")));
                    }
                };
                ClientMessage::Test { document, target }
            }
            ClientMethod::CloseProject => ClientMessage::CloseProject {
                location_hash: cursor.read_ref(table)?,
            },
        };

        cursor.finish()?;
        Ok(message)
    }
}

/// Read and decode the next message, `Ok(None)` on a clean close.
pub async fn read_client_message<R: AsyncRead + Unpin>(
    reader: &mut R,
    table: &mut WorkerStringTable,
) -> Result<Option<ClientMessage>, ProtocolError> {
    match read_client_frame(reader).await? {
        Some(frame) => ClientMessage::decode(&frame, table).map(Some),
        None => Ok(None),
    }
}

pub fn encode_pass() -> Vec<u8> {
    vec![1]
}

pub fn encode_failure(message: &str) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = vec![0];
    put_utf(&mut buf, message)?;
    Ok(buf)
}

/// Stage offset followed by the `ready` flag.
pub fn encode_calibration(offset: StageOffset, ready: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.extend_from_slice(&offset.x.to_be_bytes());
    buf.extend_from_slice(&offset.y.to_be_bytes());
    buf.push(u8::from(ready));
    buf
}

pub fn encode_style_source_request(request: &StyleSourceRequest) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = vec![ServerMethod::ResolveExternalInlineStyleDeclarationSource.code()];
    buf.extend_from_slice(&request.module.value().to_be_bytes());
    put_utf(&mut buf, &request.document)?;
    put_utf(&mut buf, &request.element_type)?;
    put_utf(&mut buf, &request.property)?;
    put_utf(&mut buf, &request.value)?;
    Ok(buf)
}

struct FrameCursor<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> FrameCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, position: 0 }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                ProtocolError::desync(format!(
                    "Frame truncated: wanted {count} bytes at offset {}, frame has {}",
                    self.position,
                    self.buf.len()
                ))
            })?;
        let slice = &self.buf[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::desync(format!("Expected boolean byte, got {other:#04x}"))),
        }
    }

    fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let bytes = self.take(4)?;
        Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self) -> Result<&'a [u8], ProtocolError> {
        let length = self.read_u32()? as usize;
        self.take(length)
    }

    fn read_ref(&mut self, table: &WorkerStringTable) -> Result<String, ProtocolError> {
        let id = self.read_u32()?;
        table.resolve(id).map(str::to_string)
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.position..]
    }

    fn finish(&self) -> Result<(), ProtocolError> {
        if self.position == self.buf.len() {
            Ok(())
        } else {
            Err(ProtocolError::desync(format!(
                "{} trailing bytes after payload",
                self.buf.len() - self.position
            )))
        }
    }
}
