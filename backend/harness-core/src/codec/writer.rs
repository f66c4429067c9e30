use crate::codec::method::ClientMethod;
use crate::codec::string_table::{StringId, StringTable, wire_len};
use crate::error::ProtocolError;

use common::ErrorLocation;

use std::panic::Location;

/// Payload of one client message, written in field order.
#[derive(Debug, Default)]
pub struct MessageBody {
    buf: Vec<u8>,
}

impl MessageBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_ref(&mut self, id: StringId) -> &mut Self {
        self.write_u32(id.value())
    }

    /// Element count of a repeated field.
    #[track_caller]
    pub fn write_len(&mut self, len: usize) -> Result<&mut Self, ProtocolError> {
        let len = wire_len(len)?;
        Ok(self.write_u32(len))
    }

    /// `u32` length followed by the raw bytes.
    #[track_caller]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, ProtocolError> {
        self.write_len(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

/// Assemble a complete frame: length, method, string flush, payload.
#[track_caller]
pub fn encode_frame(
    method: ClientMethod,
    table: &StringTable<'_>,
    body: &MessageBody,
) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = Vec::with_capacity(9 + body.as_bytes().len());
    frame.extend_from_slice(&[0; 4]);
    frame.push(method.code());
    table.encode_into(&mut frame)?;
    frame.extend_from_slice(body.as_bytes());

    let length = wire_len(frame.len() - 4)?;
    frame[..4].copy_from_slice(&length.to_be_bytes());
    Ok(frame)
}

/// `u16` length followed by UTF-8 bytes, the string form used in records.
#[track_caller]
pub(crate) fn put_utf(buf: &mut Vec<u8>, value: &str) -> Result<(), ProtocolError> {
    let length = u16::try_from(value.len()).map_err(|_| ProtocolError::Encode {
        message: format!("String of {} bytes exceeds the u16 record limit", value.len()),
        location: ErrorLocation::from(Location::caller()),
    })?;
    buf.extend_from_slice(&length.to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}
