use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::Path;

/// The IDE project a session is opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDescriptor {
    name: String,
    location_hash: String,
}

impl ProjectDescriptor {
    pub fn new(name: impl Into<String>, location_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location_hash: location_hash.into(),
        }
    }

    /// Derive the location hash from the project name and its directory.
    ///
    /// The hash only has to be stable for the lifetime of one session.
    pub fn from_location(name: impl Into<String>, location: &Path) -> Self {
        let name = name.into();
        let mut hasher = DefaultHasher::new();
        location.hash(&mut hasher);
        let location_hash = format!("{name}{:08x}", hasher.finish() as u32);

        Self {
            name,
            location_hash,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location_hash(&self) -> &str {
        &self.location_hash
    }
}
