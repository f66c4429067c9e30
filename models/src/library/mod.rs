//! Library sets: the dependency archives a session registers once, in
//! dependency order, before any module may reference them.

mod builder;

pub use builder::LibrarySetBuilder;

use crate::ProjectDescriptor;

use std::fmt::{Display, Formatter, Result as FormatResult};

/// Identifier of a registered library set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibrarySetId(String);

impl LibrarySetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A project owns exactly one set per session, keyed by its location hash.
    pub fn for_project(project: &ProjectDescriptor) -> Self {
        Self(project.location_hash().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LibrarySetId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(&self.0)
    }
}

/// How the worker creates application domains for the libraries of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DomainPolicy {
    /// One domain shared by every library in the set.
    #[default]
    OneForSet,
    /// A dedicated domain per library.
    OnePerLibrary,
}

impl DomainPolicy {
    pub fn wire_code(self) -> u8 {
        match self {
            DomainPolicy::OneForSet => 0,
            DomainPolicy::OnePerLibrary => 1,
        }
    }

    pub fn from_wire(code: u8) -> Option<Self> {
        match code {
            0 => Some(DomainPolicy::OneForSet),
            1 => Some(DomainPolicy::OnePerLibrary),
            _ => None,
        }
    }
}

/// A dependency archive placed at its sorted position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescriptor {
    name: String,
    path: String,
    position: u32,
    user_library: bool,
}

impl LibraryDescriptor {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        position: u32,
        user_library: bool,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            position,
            user_library,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn is_user_library(&self) -> bool {
        self.user_library
    }
}

/// Ordered, de-duplicated libraries registered as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySet {
    id: LibrarySetId,
    policy: DomainPolicy,
    libraries: Vec<LibraryDescriptor>,
}

impl LibrarySet {
    pub fn id(&self) -> &LibrarySetId {
        &self.id
    }

    pub fn policy(&self) -> DomainPolicy {
        self.policy
    }

    pub fn libraries(&self) -> &[LibraryDescriptor] {
        &self.libraries
    }
}
