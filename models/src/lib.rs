//! Domain models for the ADL harness.
//!
//! Pure data describing what a test session pushes to the worker and what
//! comes back: library sets, modules, documents under test, launch
//! parameters and outcomes. No I/O lives here.
//!
//! ## Architecture
//!
//! - **models** (this crate): pure data structures and validating builders
//! - **harness-core**: protocol, supervision and session logic operating on models
//! - **adl-harness**: command-line wiring

pub mod document;
pub mod error;
pub mod launch;
pub mod library;
pub mod module;
pub mod outcome;
pub mod project;

pub use common::ErrorLocation;
pub use document::DocumentUnit;
pub use error::model_error::ModelError;
pub use launch::{LaunchConfig, LaunchConfigBuilder};
pub use library::{DomainPolicy, LibraryDescriptor, LibrarySet, LibrarySetBuilder, LibrarySetId};
pub use module::{LocalStyleHolder, ModuleDescriptor, ModuleId};
pub use outcome::{SessionReport, StageOffset, TestOutcome, UnitReport, UnitResult};
pub use project::ProjectDescriptor;

#[cfg(test)]
mod tests;
