//! Binary wire protocol between the harness and the worker.
//!
//! # Frames (harness → worker)
//!
//! ```text
//! u32  frame length (bytes after this field)
//! u8   client method
//! u32  count of strings new in this change (0 is valid)
//!      count × (u32 id, u32 byte length, utf8 bytes)
//! ...  method payload, strings referenced by id only
//! ```
//!
//! # Records (worker → harness)
//!
//! Unframed, read field by field in the agreed order: one-byte booleans,
//! big-endian fixed-width integers, `u16`-length-prefixed UTF-8 strings.
//! There is no schema on the wire; field order is the contract and any
//! mismatch is fatal.

mod method;
mod reader;
mod string_table;
mod writer;
pub mod worker;

pub use method::{ClientMethod, ServerMethod};
pub use reader::{ResponseReader, StyleSourceRequest};
pub use string_table::{StringId, StringRegistry, StringTable};
pub use writer::{MessageBody, encode_frame};

/// What the worker should check a document against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestTarget {
    /// Expectations grouped under the original file's directory name.
    Group(String),
    /// A numbered scenario, used by styled and interactive tests.
    Variant(i32),
}

impl TestTarget {
    pub(crate) const GROUP_KIND: u8 = 0;
    pub(crate) const VARIANT_KIND: u8 = 1;
}
