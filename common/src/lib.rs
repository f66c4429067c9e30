//! Shared building blocks for the ADL harness crates.
//!
//! Every error enum in the workspace carries an [`ErrorLocation`] so a
//! failure reported from deep inside a session (a desynced frame, a worker
//! that exited early) still points at the call site that produced it.

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
