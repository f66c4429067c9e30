use crate::error::model_error::ModelError;
use crate::library::{DomainPolicy, LibraryDescriptor, LibrarySet, LibrarySetId};
use crate::ErrorLocation;

use std::collections::HashSet;
use std::panic::Location;

/// Builder for creating validated [`LibrarySet`] instances.
///
/// Libraries must arrive already sorted by the dependency sorter. The
/// builder keeps the first occurrence of a path and drops later duplicates,
/// then checks that the remaining positions are strictly increasing.
#[derive(Debug, Default)]
pub struct LibrarySetBuilder {
    id: Option<LibrarySetId>,
    policy: Option<DomainPolicy>,
    libraries: Vec<LibraryDescriptor>,
}

impl LibrarySetBuilder {
    pub fn with_id(mut self, id: LibrarySetId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_policy(mut self, policy: DomainPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_library(mut self, library: LibraryDescriptor) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn with_libraries(mut self, libraries: impl IntoIterator<Item = LibraryDescriptor>) -> Self {
        self.libraries.extend(libraries);
        self
    }

    /// Build the LibrarySet with validation.
    #[track_caller]
    pub fn build(self) -> Result<LibrarySet, ModelError> {
        let id = self.id.ok_or_else(|| ModelError::Missing {
            field: "Library set id",
            location: ErrorLocation::from(Location::caller()),
        })?;

        if id.as_str().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Library set id cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut seen = HashSet::new();
        let libraries: Vec<LibraryDescriptor> = self
            .libraries
            .into_iter()
            .filter(|library| seen.insert(library.path().to_string()))
            .collect();

        if libraries.is_empty() {
            return Err(ModelError::Validation {
                message: format!("Library set {id} has no libraries"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(library) = libraries.iter().find(|library| library.name().is_empty()) {
            return Err(ModelError::Validation {
                message: format!("Library at {} has an empty name", library.path()),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        for pair in libraries.windows(2) {
            if pair[1].position() <= pair[0].position() {
                return Err(ModelError::Validation {
                    message: format!(
                        "Libraries out of dependency order: {} (position {}) follows {} (position {})",
                        pair[1].name(),
                        pair[1].position(),
                        pair[0].name(),
                        pair[0].position()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        Ok(LibrarySet {
            id,
            policy: self.policy.unwrap_or_default(),
            libraries,
        })
    }
}
