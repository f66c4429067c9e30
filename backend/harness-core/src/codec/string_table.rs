//! Deduplicating string table.
//!
//! The registry lives for the whole session and hands out ids in first-seen
//! order. Each registration message opens a [`StringTable`] change on it;
//! the change records which strings are new so only those are flushed with
//! the message. A change dropped without [`StringTable::commit`] (its
//! message never made it onto the wire) gives its ids back, so the
//! session's id sequence stays gap-free.

use crate::error::ProtocolError;

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    pub const fn value(self) -> u32 {
        self.0
    }
}

/// Session-wide string → id mapping.
#[derive(Debug, Default)]
pub struct StringRegistry {
    ids: HashMap<String, StringId>,
    next_id: u32,
}

impl StringRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a change. Only one change can be open at a time.
    pub fn start_change(&mut self) -> StringTable<'_> {
        StringTable {
            registry: self,
            added: Vec::new(),
            committed: false,
        }
    }

    pub fn lookup(&self, value: &str) -> Option<StringId> {
        self.ids.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One change: the strings first introduced by a single message.
#[derive(Debug)]
pub struct StringTable<'a> {
    registry: &'a mut StringRegistry,
    added: Vec<(StringId, String)>,
    committed: bool,
}

impl StringTable<'_> {
    /// Id for `value`, assigning the next one if the session has not seen it.
    pub fn intern(&mut self, value: &str) -> StringId {
        if let Some(id) = self.registry.ids.get(value) {
            return *id;
        }

        let id = StringId(self.registry.next_id);
        self.registry.next_id += 1;
        self.registry.ids.insert(value.to_string(), id);
        self.added.push((id, value.to_string()));
        id
    }

    /// Strings new in this change, in id order.
    pub fn added(&self) -> &[(StringId, String)] {
        &self.added
    }

    /// Append `count` followed by every new `(id, length, bytes)` entry.
    #[track_caller]
    pub fn encode_into(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.extend_from_slice(&wire_len(self.added.len())?.to_be_bytes());
        for (id, value) in &self.added {
            buf.extend_from_slice(&id.value().to_be_bytes());
            buf.extend_from_slice(&wire_len(value.len())?.to_be_bytes());
            buf.extend_from_slice(value.as_bytes());
        }
        Ok(())
    }

    /// Keep the ids assigned by this change.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StringTable<'_> {
    fn drop(&mut self) {
        if self.committed || self.added.is_empty() {
            return;
        }

        for (_, value) in &self.added {
            self.registry.ids.remove(value);
        }
        self.registry.next_id -= self.added.len() as u32;
        self.added.clear();
    }
}

#[track_caller]
pub(crate) fn wire_len(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len).map_err(|_| ProtocolError::Encode {
        message: format!("Length {len} does not fit a u32 field"),
        location: ErrorLocation::from(Location::caller()),
    })
}
